//! Dense id assignment for states, events and history pseudostates.
//!
//! Ids are assigned in one deterministic pre-order pass and frozen into
//! an [`IndexTables`] value that every downstream emitter shares, so
//! the `state_parent[]`/`state_depth[]` tables stay indexable by
//! `StateId` without any re-derivation.

use std::collections::HashMap;

use crate::hsm::{Hsm, Vertex, VertexId, DO};

/// Dense index of a named state, `[0, state_count)`. The root is not a
/// state; it is represented by the generated `ROOT` sentinel instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u16);

/// Dense index of a declared event, `[0, event_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u16);

/// Immutable id tables produced by [`IndexTables::build`].
#[derive(Debug)]
pub struct IndexTables {
    /// StateId → vertex, pre-order over the containment tree.
    states: Vec<VertexId>,
    /// Vertex arena slot → StateId, for named states only.
    state_of_vertex: Vec<Option<StateId>>,
    /// EventId → raw trigger name, declaration order; `DO` appended
    /// when referenced but not declared.
    events: Vec<String>,
    event_of_name: HashMap<String, EventId>,
    /// HistoryId → history vertex, pre-order.
    histories: Vec<VertexId>,
    /// Deepest named state (root = 0); bounds the generated
    /// enter-path buffer.
    max_depth: u16,
    uses_do: bool,
}

impl IndexTables {
    /// Walk the graph once and assign every id.
    #[must_use]
    pub fn build(hsm: &Hsm) -> Self {
        let mut tables = IndexTables {
            states: Vec::new(),
            state_of_vertex: vec![None; hsm.vertex_count()],
            events: Vec::new(),
            event_of_name: HashMap::new(),
            histories: Vec::new(),
            max_depth: 0,
            uses_do: hsm.uses_do(),
        };

        tables.visit(hsm, Hsm::ROOT);

        for name in hsm.events() {
            tables.declare_event(name);
        }
        if tables.uses_do {
            tables.declare_event(DO);
        }

        log::debug!(
            "indexed '{}': {} states, {} events, {} histories, max depth {}",
            hsm.name(),
            tables.states.len(),
            tables.events.len(),
            tables.histories.len(),
            tables.max_depth
        );
        tables
    }

    fn visit(&mut self, hsm: &Hsm, vertex: VertexId) {
        for &child in hsm.children_of(vertex) {
            match hsm.vertex(child) {
                Vertex::State(s) => {
                    let id = StateId(u16::try_from(self.states.len()).expect("state count fits u16"));
                    self.states.push(child);
                    self.state_of_vertex[child.0] = Some(id);
                    if s.depth > self.max_depth {
                        self.max_depth = s.depth;
                    }
                    self.visit(hsm, child);
                }
                Vertex::History(_) => self.histories.push(child),
                Vertex::Initial(_) | Vertex::Root(_) => {}
            }
        }
    }

    fn declare_event(&mut self, name: &str) {
        if !self.event_of_name.contains_key(name) {
            let id = EventId(u16::try_from(self.events.len()).expect("event count fits u16"));
            self.events.push(name.to_string());
            self.event_of_name.insert(name.to_string(), id);
        }
    }

    /// Named-state vertices in StateId order.
    #[must_use]
    pub fn states(&self) -> &[VertexId] {
        &self.states
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn state_id(&self, vertex: VertexId) -> Option<StateId> {
        self.state_of_vertex.get(vertex.0).copied().flatten()
    }

    /// Raw trigger names in EventId order.
    #[must_use]
    pub fn events(&self) -> &[String] {
        &self.events
    }

    #[must_use]
    pub fn event_id(&self, name: &str) -> Option<EventId> {
        self.event_of_name.get(name).copied()
    }

    /// History vertices in HistoryId order.
    #[must_use]
    pub fn histories(&self) -> &[VertexId] {
        &self.histories
    }

    #[must_use]
    pub fn max_depth(&self) -> u16 {
        self.max_depth
    }

    #[must_use]
    pub fn uses_do(&self) -> bool {
        self.uses_do
    }
}
