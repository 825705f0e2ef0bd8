//! In-memory hierarchical-state-machine graph consumed by the emitter.
//!
//! The graph is arena-backed: vertices and behaviors live in flat
//! vectors and refer to each other by index. The containment structure
//! is a tree by construction (a vertex's parent is fixed at creation),
//! so no cycle handling is needed anywhere downstream.
//!
//! [`HsmBuilder`] is the construction surface a graph provider targets.
//! It wires parent/child indices and depths as vertices are added and
//! defers cross-vertex validation (sibling-name uniqueness, initial
//! targets) to [`HsmBuilder::finish`].

use std::collections::HashSet;

/// Reserved lifecycle trigger: the behavior runs when its state is
/// entered. Never a transition trigger.
pub const ENTER: &str = "enter";

/// Reserved lifecycle trigger: the behavior runs when its state is
/// exited. Never a transition trigger.
pub const EXIT: &str = "exit";

/// The UML completion event. Auto-dispatched by the generated code
/// after every settled transition when any behavior references it.
pub const DO: &str = "DO";

/// Index of a vertex in the machine's vertex arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub(crate) usize);

/// Index of a behavior in the machine's behavior arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BehaviorId(pub(crate) usize);

/// A guard/action/transition attached to a vertex.
///
/// A behavior with a `target` is a transition; without one it is a
/// lifecycle or internal behavior. Guard and action text are opaque
/// source fragments owned by the diagram; the emitter never interprets
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Behavior {
    pub triggers: Vec<String>,
    pub guard: Option<String>,
    pub action: Option<String>,
    pub target: Option<VertexId>,
}

impl Behavior {
    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.target.is_some()
    }

    /// True when the behavior carries non-blank guard text.
    #[must_use]
    pub fn has_guard(&self) -> bool {
        self.guard.as_deref().is_some_and(|g| !g.trim().is_empty())
    }

    /// True when the behavior carries non-blank action text.
    #[must_use]
    pub fn has_action(&self) -> bool {
        self.action.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Shallow,
    Deep,
}

/// The root region. Exactly one per machine, always arena slot 0.
#[derive(Debug)]
pub struct RootState {
    pub children: Vec<VertexId>,
    /// Only lifecycle behaviors are meaningful here; the root is never
    /// entered or exited after `start`.
    pub behaviors: Vec<BehaviorId>,
}

/// An ordinary named state.
#[derive(Debug)]
pub struct NamedVertex {
    pub name: String,
    pub parent: VertexId,
    /// Root is 0, its children are 1, and so on.
    pub depth: u16,
    pub children: Vec<VertexId>,
    pub behaviors: Vec<BehaviorId>,
    /// Declared by the graph provider for parallel regions. The table
    /// algorithm rejects machines containing one.
    pub orthogonal: bool,
}

/// The initial pseudostate of a region. Carries at most one behavior,
/// whose target must be a sibling named state.
#[derive(Debug)]
pub struct InitialPseudostate {
    pub parent: VertexId,
    pub behavior: Option<BehaviorId>,
}

/// A history pseudostate. Costs one runtime slot on the generated
/// machine, updated whenever a direct child of `parent` is exited.
#[derive(Debug)]
pub struct HistoryPseudostate {
    pub parent: VertexId,
    pub kind: HistoryKind,
}

/// Vertex variants, matched exhaustively everywhere.
#[derive(Debug)]
pub enum Vertex {
    Root(RootState),
    State(NamedVertex),
    Initial(InitialPseudostate),
    History(HistoryPseudostate),
}

/// A fully-built, validated hierarchical state machine.
#[derive(Debug)]
pub struct Hsm {
    name: String,
    events: Vec<String>,
    variables: Option<String>,
    vertices: Vec<Vertex>,
    behaviors: Vec<Behavior>,
}

impl Hsm {
    pub const ROOT: VertexId = VertexId(0);

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared event names, declaration order preserved.
    #[must_use]
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Variable-declaration text attached to the diagram, if any.
    #[must_use]
    pub fn variables(&self) -> Option<&str> {
        self.variables.as_deref()
    }

    #[must_use]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    #[must_use]
    pub fn behavior(&self, id: BehaviorId) -> &Behavior {
        &self.behaviors[id.0]
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.vertices.len()).map(VertexId)
    }

    /// The named state behind `id`. Panics on pseudostates; callers
    /// hold ids they obtained from named-state traversal.
    #[must_use]
    pub fn state(&self, id: VertexId) -> &NamedVertex {
        match self.vertex(id) {
            Vertex::State(s) => s,
            other => panic!("vertex {id:?} is not a named state: {other:?}"),
        }
    }

    /// Direct children of a root or named-state vertex, in declared
    /// order. Pseudostates have no children.
    #[must_use]
    pub fn children_of(&self, id: VertexId) -> &[VertexId] {
        match self.vertex(id) {
            Vertex::Root(r) => &r.children,
            Vertex::State(s) => &s.children,
            Vertex::Initial(_) | Vertex::History(_) => &[],
        }
    }

    /// Behaviors of a root or named-state vertex, in declared order.
    #[must_use]
    pub fn behaviors_of(&self, id: VertexId) -> &[BehaviorId] {
        match self.vertex(id) {
            Vertex::Root(r) => &r.behaviors,
            Vertex::State(s) => &s.behaviors,
            Vertex::Initial(_) | Vertex::History(_) => &[],
        }
    }

    /// Original diagram name for diagnostics; `<root>` for the root.
    #[must_use]
    pub fn vertex_name(&self, id: VertexId) -> &str {
        match self.vertex(id) {
            Vertex::State(s) => &s.name,
            _ => "<root>",
        }
    }

    /// The initial pseudostate of the given region, if declared.
    #[must_use]
    pub fn initial_of(&self, parent: VertexId) -> Option<&InitialPseudostate> {
        self.children_of(parent)
            .iter()
            .find_map(|&c| match self.vertex(c) {
                Vertex::Initial(i) => Some(i),
                _ => None,
            })
    }

    /// True when any behavior names the completion event as a trigger.
    #[must_use]
    pub fn uses_do(&self) -> bool {
        self.behaviors
            .iter()
            .any(|b| b.triggers.iter().any(|t| t == DO))
    }
}

/// Construction error reported by [`HsmBuilder::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Two siblings share a name.
    DuplicateSiblingName { parent: String, name: String },
    /// An initial pseudostate's target is not a sibling named state.
    InitialTargetNotSibling { parent: String },
    /// A region declares more than one initial pseudostate.
    MultipleInitialStates { parent: String },
    /// A declared event name is empty.
    EmptyEventName,
}

impl core::fmt::Display for BuildError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BuildError::DuplicateSiblingName { parent, name } => {
                write!(f, "duplicate state name '{name}' under '{parent}'")
            }
            BuildError::InitialTargetNotSibling { parent } => {
                write!(
                    f,
                    "initial state of '{parent}' must target a direct child state"
                )
            }
            BuildError::MultipleInitialStates { parent } => {
                write!(f, "'{parent}' declares more than one initial state")
            }
            BuildError::EmptyEventName => write!(f, "event names must be non-empty"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Incremental graph builder.
///
/// Vertices are appended depth-first by the caller; ids hand out in
/// insertion order, which is also the id-assignment order the emitter
/// uses downstream.
#[derive(Debug)]
pub struct HsmBuilder {
    name: String,
    events: Vec<String>,
    variables: Option<String>,
    vertices: Vec<Vertex>,
    behaviors: Vec<Behavior>,
}

impl HsmBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        HsmBuilder {
            name: name.to_string(),
            events: Vec::new(),
            variables: None,
            vertices: vec![Vertex::Root(RootState {
                children: Vec::new(),
                behaviors: Vec::new(),
            })],
            behaviors: Vec::new(),
        }
    }

    /// Declare an event. Re-declaring an event is harmless; the first
    /// declaration fixes its position.
    pub fn event(&mut self, name: &str) -> &mut Self {
        if !self.events.iter().any(|e| e == name) {
            self.events.push(name.to_string());
        }
        self
    }

    /// Attach variable-declaration text, one C declaration per line.
    pub fn variables(&mut self, decls: &str) -> &mut Self {
        self.variables = Some(decls.to_string());
        self
    }

    /// Add a named state under `parent` (the root or another state).
    pub fn state(&mut self, parent: VertexId, name: &str) -> VertexId {
        let depth = match &self.vertices[parent.0] {
            Vertex::Root(_) => 1,
            Vertex::State(s) => s.depth + 1,
            other => panic!("cannot nest a state under a pseudostate: {other:?}"),
        };
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex::State(NamedVertex {
            name: name.to_string(),
            parent,
            depth,
            children: Vec::new(),
            behaviors: Vec::new(),
            orthogonal: false,
        }));
        self.push_child(parent, id);
        id
    }

    /// Mark a state as an orthogonal (parallel) region.
    pub fn orthogonal(&mut self, state: VertexId) -> &mut Self {
        match &mut self.vertices[state.0] {
            Vertex::State(s) => s.orthogonal = true,
            other => panic!("cannot mark a pseudostate orthogonal: {other:?}"),
        }
        self
    }

    /// Add an initial pseudostate under `parent` targeting `target`,
    /// with an optional transition action.
    pub fn initial(
        &mut self,
        parent: VertexId,
        target: VertexId,
        action: Option<&str>,
    ) -> VertexId {
        let behavior = BehaviorId(self.behaviors.len());
        self.behaviors.push(Behavior {
            triggers: Vec::new(),
            guard: None,
            action: action.map(str::to_string),
            target: Some(target),
        });
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex::Initial(InitialPseudostate {
            parent,
            behavior: Some(behavior),
        }));
        self.push_child(parent, id);
        id
    }

    /// Add a history pseudostate under `parent`.
    pub fn history(&mut self, parent: VertexId, kind: HistoryKind) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices
            .push(Vertex::History(HistoryPseudostate { parent, kind }));
        self.push_child(parent, id);
        id
    }

    /// Add a transition behavior on `state`.
    pub fn transition(
        &mut self,
        state: VertexId,
        triggers: &[&str],
        guard: Option<&str>,
        action: Option<&str>,
        target: VertexId,
    ) -> BehaviorId {
        self.behavior_on(
            state,
            triggers,
            guard.map(str::to_string),
            action.map(str::to_string),
            Some(target),
        )
    }

    /// Add an enter lifecycle behavior on `state` (or the root).
    pub fn on_enter(&mut self, state: VertexId, action: &str) -> BehaviorId {
        self.behavior_on(state, &[ENTER], None, Some(action.to_string()), None)
    }

    /// Add an exit lifecycle behavior on `state`.
    pub fn on_exit(&mut self, state: VertexId, action: &str) -> BehaviorId {
        self.behavior_on(state, &[EXIT], None, Some(action.to_string()), None)
    }

    fn behavior_on(
        &mut self,
        vertex: VertexId,
        triggers: &[&str],
        guard: Option<String>,
        action: Option<String>,
        target: Option<VertexId>,
    ) -> BehaviorId {
        let id = BehaviorId(self.behaviors.len());
        self.behaviors.push(Behavior {
            triggers: triggers.iter().map(|t| (*t).to_string()).collect(),
            guard,
            action,
            target,
        });
        match &mut self.vertices[vertex.0] {
            Vertex::Root(r) => r.behaviors.push(id),
            Vertex::State(s) => s.behaviors.push(id),
            other => panic!("cannot attach a behavior to {other:?}"),
        }
        id
    }

    fn push_child(&mut self, parent: VertexId, child: VertexId) {
        match &mut self.vertices[parent.0] {
            Vertex::Root(r) => r.children.push(child),
            Vertex::State(s) => s.children.push(child),
            other => panic!("cannot attach a child to {other:?}"),
        }
    }

    /// Validate the graph and freeze it into an [`Hsm`].
    pub fn finish(self) -> Result<Hsm, BuildError> {
        for e in &self.events {
            if e.trim().is_empty() {
                return Err(BuildError::EmptyEventName);
            }
        }
        for vertex in &self.vertices {
            let (children, parent_name) = match vertex {
                Vertex::Root(r) => (&r.children, "<root>".to_string()),
                Vertex::State(s) => (&s.children, s.name.clone()),
                _ => continue,
            };
            let mut names = HashSet::new();
            let mut initial_seen = false;
            for &child in children {
                match &self.vertices[child.0] {
                    Vertex::State(s) => {
                        if !names.insert(s.name.clone()) {
                            return Err(BuildError::DuplicateSiblingName {
                                parent: parent_name.clone(),
                                name: s.name.clone(),
                            });
                        }
                    }
                    Vertex::Initial(init) => {
                        if initial_seen {
                            return Err(BuildError::MultipleInitialStates {
                                parent: parent_name.clone(),
                            });
                        }
                        initial_seen = true;
                        let target = init
                            .behavior
                            .and_then(|b| self.behaviors[b.0].target);
                        let sibling = target.is_some_and(|t| {
                            children.contains(&t)
                                && matches!(self.vertices[t.0], Vertex::State(_))
                        });
                        if !sibling {
                            return Err(BuildError::InitialTargetNotSibling {
                                parent: parent_name.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(Hsm {
            name: self.name,
            events: self.events,
            variables: self.variables,
            vertices: self.vertices,
            behaviors: self.behaviors,
        })
    }
}
