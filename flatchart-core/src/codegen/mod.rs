//! The Table1 code generator.
//!
//! [`TableCodeGenerator`] drives the whole emission: validate the bound
//! machine, assign ids, collect the flat transition table, resolve
//! every generated identifier once, then write the C99 translation
//! unit phase by phase into an in-memory buffer. Emission is a pure
//! function of its inputs; generating the same machine twice yields
//! byte-identical output.

mod behavior;
mod runtime;
mod tables;

use crate::collect::{collect, TransitionSet};
use crate::config::RenderConfig;
use crate::error::{GenerateError, MangleError};
use crate::expand::Expander;
use crate::hsm::{HistoryKind, Hsm, Vertex};
use crate::index::{IndexTables, StateId};
use crate::mangle::{sanitize, to_snake, to_upper_snake, NameMangler};
use crate::writer::CodeWriter;

/// Generator facade: configure once, bind a machine, emit.
pub struct TableCodeGenerator<'h, M, X> {
    config: RenderConfig,
    mangler: M,
    expander: X,
    hsm: Option<&'h Hsm>,
}

impl<'h, M: NameMangler, X: Expander> TableCodeGenerator<'h, M, X> {
    #[must_use]
    pub fn new(config: RenderConfig, mangler: M, expander: X) -> Self {
        TableCodeGenerator {
            config,
            mangler,
            expander,
            hsm: None,
        }
    }

    /// Bind the machine to emit. The graph is only borrowed; nothing
    /// is copied or mutated.
    pub fn bind(&mut self, hsm: &'h Hsm) -> &mut Self {
        self.hsm = Some(hsm);
        self
    }

    /// Emit the complete C99 translation unit.
    ///
    /// # Errors
    /// See [`GenerateError`]; every failure is terminal and names the
    /// offending state by its diagram name.
    pub fn generate(&self) -> Result<String, GenerateError> {
        let hsm = self.hsm.ok_or(GenerateError::NullStateMachine)?;
        validate(hsm)?;

        let index = IndexTables::build(hsm);
        let set = collect(hsm, &index, &self.mangler)?;
        let names = Names::resolve(hsm, &index, &self.mangler)?;
        let ctx = EmitCtx {
            hsm,
            index: &index,
            set: &set,
            names: &names,
            config: &self.config,
        };

        let mut w = CodeWriter::new();
        emit_file_comment(&mut w, &ctx);
        emit_state_enum(&mut w, &ctx);
        emit_event_enum(&mut w, &ctx);
        emit_history_enums(&mut w, &ctx);
        emit_transition_typedef(&mut w, &ctx);
        emit_slot_enums(&mut w, &ctx);
        emit_vars_struct(&mut w, &ctx);
        emit_machine_struct(&mut w, &ctx);
        emit_manifest(&mut w, &ctx);
        tables::emit(&mut w, &ctx);
        emit_prototypes(&mut w, &ctx);
        runtime::emit_state_lookups(&mut w, &ctx);
        behavior::emit(&mut w, &ctx, &self.expander);
        runtime::emit_lifecycle_switches(&mut w, &ctx, &self.expander);
        runtime::emit_transition_protocol(&mut w, &ctx);
        runtime::emit_dispatcher(&mut w, &ctx);
        emit_constructor(&mut w, &ctx);
        runtime::emit_start(&mut w, &ctx, &self.expander);
        if self.config.string_helpers {
            emit_string_helpers(&mut w, &ctx);
        }

        let out = w.finish();
        log::debug!(
            "emitted {} bytes of C99 for '{}' ({} transition rows)",
            out.len(),
            hsm.name(),
            set.entries.len()
        );
        Ok(out)
    }
}

impl<'h> TableCodeGenerator<'h, crate::mangle::C99Mangler, crate::expand::VerbatimExpander> {
    /// Generator with the stock C99 mangler and pass-through expander.
    #[must_use]
    pub fn with_defaults(config: RenderConfig) -> Self {
        TableCodeGenerator::new(
            config,
            crate::mangle::C99Mangler,
            crate::expand::VerbatimExpander,
        )
    }
}

/// Structural checks that must hold before any emission starts.
fn validate(hsm: &Hsm) -> Result<(), GenerateError> {
    for id in hsm.vertex_ids() {
        if let Vertex::State(s) = hsm.vertex(id) {
            if s.orthogonal {
                return Err(GenerateError::OrthogonalRegions {
                    state: s.name.clone(),
                });
            }
        }
    }
    let initial_target_is_state = hsm.initial_of(Hsm::ROOT).is_some_and(|init| {
        init.behavior
            .and_then(|b| hsm.behavior(b).target)
            .is_some_and(|t| matches!(hsm.vertex(t), Vertex::State(_)))
    });
    if !initial_target_is_state {
        return Err(GenerateError::MissingInitialState {
            machine: hsm.name().to_string(),
        });
    }
    Ok(())
}

/// Everything the emit phases share, read-only.
pub(crate) struct EmitCtx<'a> {
    pub hsm: &'a Hsm,
    pub index: &'a IndexTables,
    pub set: &'a TransitionSet,
    pub names: &'a Names,
    pub config: &'a RenderConfig,
}

impl EmitCtx<'_> {
    /// The root initial pseudostate's transition behavior. Validation
    /// guarantees it exists with a named-state target.
    pub fn root_initial_behavior(&self) -> &crate::hsm::Behavior {
        let init = self
            .hsm
            .initial_of(Hsm::ROOT)
            .expect("validated root initial");
        self.hsm
            .behavior(init.behavior.expect("validated initial behavior"))
    }

    pub fn root_initial_target(&self) -> StateId {
        let target = self
            .root_initial_behavior()
            .target
            .expect("validated initial target");
        self.index
            .state_id(target)
            .expect("validated initial target is a state")
    }

    pub fn has_vars(&self) -> bool {
        self.hsm
            .variables()
            .is_some_and(|v| !v.trim().is_empty())
            || !self.config.variable_declarations.is_empty()
    }
}

/// Per-history generated names and members.
///
/// A shallow slot is typed by a bespoke enum listing the parent's
/// direct children; a deep slot is typed by the state enum itself so it
/// can record any descendant.
#[derive(Debug)]
pub(crate) struct HistoryNames {
    pub kind: HistoryKind,
    /// Slot type: the bespoke enum for shallow slots, the state enum
    /// for deep slots.
    pub enum_name: String,
    pub field: String,
    /// The history's parent region, as a state id (never the root
    /// unless the diagram puts a history directly under it, in which
    /// case the slot is dropped during resolution).
    pub parent: StateId,
    /// Shallow only: (member name, pinned value = child state id),
    /// declared order. Empty for deep slots.
    pub members: Vec<(String, u16)>,
    /// Constructor default: the parent's first child, spelled in the
    /// slot's type.
    pub initial_member: String,
}

/// Every generated identifier, resolved exactly once.
///
/// Pre-resolving keeps mangling failures out of the emit phases and
/// makes the injectivity check a single place.
#[derive(Debug)]
pub(crate) struct Names {
    pub type_name: String,
    /// Upper-snake macro/member prefix, e.g. `BLINKY`.
    pub prefix: String,
    /// Lower-snake static-table prefix, e.g. `blinky`.
    pub table: String,
    pub states: Vec<String>,
    pub state_raw: Vec<String>,
    pub root_state: String,
    pub events: Vec<String>,
    pub event_raw: Vec<String>,
    pub histories: Vec<HistoryNames>,
    pub init_fn: String,
    pub start_fn: String,
    pub dispatch_fn: String,
    pub state_field: String,
}

impl Names {
    pub(crate) fn resolve(
        hsm: &Hsm,
        index: &IndexTables,
        mangler: &dyn NameMangler,
    ) -> Result<Names, GenerateError> {
        let type_name = mangler.type_name(hsm.name())?;
        let prefix = to_upper_snake(&sanitize(hsm.name(), "machine")?);
        let table = to_snake(&type_name);

        let mut states = Vec::with_capacity(index.state_count());
        let mut state_raw: Vec<String> = Vec::with_capacity(index.state_count());
        for &v in index.states() {
            let raw = hsm.state(v).name.clone();
            let mangled = mangler.state_enum_value(hsm.name(), &raw)?;
            if let Some(pos) = states.iter().position(|s| s == &mangled) {
                return Err(MangleError::Collision {
                    first: state_raw[pos].clone(),
                    second: raw,
                    mangled,
                }
                .into());
            }
            states.push(mangled);
            state_raw.push(raw);
        }
        let root_state = format!("{prefix}_STATE_ROOT");

        let mut events = Vec::with_capacity(index.events().len());
        let mut event_raw = Vec::with_capacity(index.events().len());
        for name in index.events() {
            // Collisions were already rejected during collection.
            events.push(mangler.event_enum_value(hsm.name(), name)?);
            event_raw.push(name.clone());
        }

        let mut histories = Vec::new();
        for &h in index.histories() {
            let (parent_vertex, kind) = match hsm.vertex(h) {
                Vertex::History(hist) => (hist.parent, hist.kind),
                _ => continue,
            };
            let Some(parent) = index.state_id(parent_vertex) else {
                log::warn!(
                    "history pseudostate directly under the root has no parent slot; dropped"
                );
                continue;
            };
            let parent_name = hsm.vertex_name(parent_vertex).to_string();
            let children: Vec<(&str, StateId)> = hsm
                .children_of(parent_vertex)
                .iter()
                .filter_map(|&child| match hsm.vertex(child) {
                    Vertex::State(c) => {
                        let id = index.state_id(child).expect("child state is indexed");
                        Some((c.name.as_str(), id))
                    }
                    _ => None,
                })
                .collect();
            if children.is_empty() {
                log::warn!("history pseudostate under childless '{parent_name}' dropped");
                continue;
            }
            let history = match kind {
                HistoryKind::Shallow => {
                    let mut members = Vec::with_capacity(children.len());
                    for (child_name, id) in &children {
                        let member =
                            mangler.history_member(hsm.name(), &parent_name, child_name)?;
                        members.push((member, id.0));
                    }
                    let initial_member = members[0].0.clone();
                    HistoryNames {
                        kind,
                        enum_name: mangler.history_enum_name(hsm.name(), &parent_name)?,
                        field: mangler.history_field(&parent_name, kind)?,
                        parent,
                        members,
                        initial_member,
                    }
                }
                // A deep slot can hold any descendant, so it is typed
                // by the state enum rather than a bespoke one.
                HistoryKind::Deep => HistoryNames {
                    kind,
                    enum_name: format!("{type_name}StateId"),
                    field: mangler.history_field(&parent_name, kind)?,
                    parent,
                    members: Vec::new(),
                    initial_member: states[children[0].1 .0 as usize].clone(),
                },
            };
            histories.push(history);
        }

        Ok(Names {
            init_fn: mangler.init_routine(&type_name),
            start_fn: mangler.start_routine(&type_name),
            dispatch_fn: mangler.dispatch_routine(&type_name),
            state_field: mangler.state_field().to_string(),
            type_name,
            prefix,
            table,
            states,
            state_raw,
            root_state,
            events,
            event_raw,
            histories,
        })
    }

    pub fn state_enum(&self) -> String {
        format!("{}StateId", self.type_name)
    }

    pub fn event_enum(&self) -> String {
        format!("{}EventId", self.type_name)
    }

    pub fn guard_enum(&self) -> String {
        format!("{}GuardId", self.type_name)
    }

    pub fn action_enum(&self) -> String {
        format!("{}ActionId", self.type_name)
    }

    pub fn vars_type(&self) -> String {
        format!("{}Vars", self.type_name)
    }

    pub fn state_count_macro(&self) -> String {
        format!("{}_STATE_COUNT", self.prefix)
    }

    pub fn transition_count_macro(&self) -> String {
        format!("{}_TRANSITION_COUNT", self.prefix)
    }

    pub fn max_depth_macro(&self) -> String {
        format!("{}_MAX_DEPTH", self.prefix)
    }

    pub fn event_count_member(&self) -> String {
        format!("{}_EVENT_COUNT", self.prefix)
    }

    pub fn guard_none(&self) -> String {
        format!("{}_GUARD_NONE", self.prefix)
    }

    pub fn guard_member(&self, slot: u16) -> String {
        if slot == 0 {
            self.guard_none()
        } else {
            format!("{}_GUARD_{}", self.prefix, slot)
        }
    }

    pub fn action_none(&self) -> String {
        format!("{}_ACTION_NONE", self.prefix)
    }

    pub fn action_member(&self, slot: u16) -> String {
        if slot == 0 {
            self.action_none()
        } else {
            format!("{}_ACTION_{}", self.prefix, slot)
        }
    }

    pub fn state_member(&self, id: StateId) -> &str {
        &self.states[id.0 as usize]
    }

    pub fn event_member(&self, id: crate::index::EventId) -> &str {
        &self.events[id.0 as usize]
    }

    pub fn helper(&self, suffix: &str) -> String {
        format!("{}_{}", self.type_name, suffix)
    }

    pub fn transitions_table(&self) -> String {
        format!("{}_transitions", self.table)
    }

    pub fn parent_table(&self) -> String {
        format!("{}_state_parent", self.table)
    }

    pub fn depth_table(&self) -> String {
        format!("{}_state_depth", self.table)
    }
}

fn emit_file_comment(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.line("/*");
    w.line(&format!(
        " * {} -- table-driven hierarchical state machine.",
        names.type_name
    ));
    w.line(&format!(
        " * Generated from statechart '{}' (algorithm Table1, sink C99).",
        ctx.hsm.name()
    ));
    w.line(" *");
    w.line(&format!(
        " * Call {}() once, then {}() exactly once before dispatching.",
        names.init_fn, names.start_fn
    ));
    w.line(" * Events with no matching table row are silently ignored.");
    w.line(" *");
    w.line(" * Not thread-safe: dispatching, starting and reads of the state");
    w.line(" * field must be serialized by the caller.");
    if ctx.index.uses_do() {
        w.line(" *");
        w.line(" * The DO completion event is re-dispatched after every settled");
        w.line(" * transition. Guards on DO transitions must break completion");
        w.line(" * cycles; the generated code performs a plain reentrant call.");
    }
    w.line(" */");
    w.blank();
}

fn emit_state_enum(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block("typedef enum");
    for (i, member) in names.states.iter().enumerate() {
        w.line(&format!("{member} = {i},"));
    }
    w.line(&format!("{} = {}", names.root_state, names.states.len()));
    w.close_block(&format!("}} {};", names.state_enum()));
    w.blank();
}

fn emit_event_enum(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block("typedef enum");
    for (i, member) in names.events.iter().enumerate() {
        w.line(&format!("{member} = {i},"));
    }
    w.line(&format!(
        "{} = {}",
        names.event_count_member(),
        names.events.len()
    ));
    w.close_block(&format!("}} {};", names.event_enum()));
    w.blank();
}

fn emit_history_enums(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    for history in &ctx.names.histories {
        if history.kind == HistoryKind::Deep {
            continue;
        }
        w.start_block("typedef enum");
        let last = history.members.len() - 1;
        for (i, (member, value)) in history.members.iter().enumerate() {
            let comma = if i == last { "" } else { "," };
            w.line(&format!("{member} = {value}{comma}"));
        }
        w.close_block(&format!("}} {};", history.enum_name));
        w.blank();
    }
}

fn emit_transition_typedef(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block("typedef struct");
    w.line(&format!("{} currentState;", names.state_enum()));
    w.line(&format!("{} trigger;", names.event_enum()));
    w.line(&format!("{} nextState;", names.state_enum()));
    w.line(&format!("{} actionIndex;", names.action_enum()));
    w.line(&format!("{} guardIndex;", names.guard_enum()));
    w.close_block(&format!("}} {}Transition;", names.type_name));
    w.blank();
}

fn emit_slot_enums(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block("typedef enum");
    if ctx.set.guards.is_empty() {
        w.line(&format!("{} = 0", names.guard_none()));
    } else {
        w.line(&format!("{} = 0,", names.guard_none()));
        let last = ctx.set.guards.len();
        for slot in 1..=last {
            let comma = if slot == last { "" } else { "," };
            w.line(&format!("{} = {slot}{comma}", names.guard_member(slot as u16)));
        }
    }
    w.close_block(&format!("}} {};", names.guard_enum()));
    w.blank();

    w.start_block("typedef enum");
    if ctx.set.actions.is_empty() {
        w.line(&format!("{} = 0", names.action_none()));
    } else {
        w.line(&format!("{} = 0,", names.action_none()));
        let last = ctx.set.actions.len();
        for slot in 1..=last {
            let comma = if slot == last { "" } else { "," };
            w.line(&format!(
                "{} = {slot}{comma}",
                names.action_member(slot as u16)
            ));
        }
    }
    w.close_block(&format!("}} {};", names.action_enum()));
    w.blank();
}

fn emit_vars_struct(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    if !ctx.has_vars() {
        return;
    }
    w.start_block("typedef struct");
    if let Some(vars) = ctx.hsm.variables() {
        w.lines(vars);
    }
    for decl in &ctx.config.variable_declarations {
        w.line(decl.trim_end());
    }
    w.close_block(&format!("}} {};", ctx.names.vars_type()));
    w.blank();
}

fn emit_machine_struct(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block(&format!("typedef struct {}", names.type_name));
    w.line("/* Read-only outside the generated routines. */");
    w.line(&format!("{} {};", names.state_enum(), names.state_field));
    for history in &names.histories {
        w.line(&format!("{} {};", history.enum_name, history.field));
    }
    if ctx.has_vars() {
        w.line(&format!("{} vars;", names.vars_type()));
    }
    w.close_block(&format!("}} {};", names.type_name));
    w.blank();
}

fn emit_manifest(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.line(&format!(
        "#define {} {}",
        names.state_count_macro(),
        ctx.index.state_count()
    ));
    w.line(&format!(
        "#define {} {}",
        names.transition_count_macro(),
        ctx.set.entries.len()
    ));
    w.line(&format!(
        "#define {} {}",
        names.max_depth_macro(),
        ctx.index.max_depth()
    ));
    w.blank();
}

fn emit_prototypes(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    let ty = &names.type_name;
    let state = names.state_enum();
    w.line(&format!(
        "static {state} {}({state} id);",
        names.helper("GetStateParent")
    ));
    w.line(&format!(
        "static int {}({state} id);",
        names.helper("GetStateDepth")
    ));
    w.line(&format!(
        "static int {}({ty} *self, {} idx);",
        names.helper("EvaluateGuard"),
        names.guard_enum()
    ));
    w.line(&format!(
        "static void {}({ty} *self, {} idx);",
        names.helper("ExecuteAction"),
        names.action_enum()
    ));
    w.line(&format!(
        "static void {}({ty} *self, {state} id);",
        names.helper("CallStateEnter")
    ));
    w.line(&format!(
        "static void {}({ty} *self, {state} id);",
        names.helper("CallStateExit")
    ));
    w.line(&format!(
        "static void {}({ty} *self, {state} from, {state} lca);",
        names.helper("ExitUpTo")
    ));
    w.line(&format!(
        "static void {}({ty} *self, {state} lca, {state} to);",
        names.helper("EnterDownTo")
    ));
    w.line(&format!(
        "static void {}({ty} *self, {state} from, {state} to, {} actionIdx);",
        names.helper("PerformTransition"),
        names.action_enum()
    ));
    w.line(&format!("void {}({ty} *self);", names.init_fn));
    w.line(&format!("void {}({ty} *self);", names.start_fn));
    w.line(&format!(
        "void {}({ty} *self, {} event);",
        names.dispatch_fn,
        names.event_enum()
    ));
    if ctx.config.string_helpers {
        w.line(&format!(
            "const char *{}({state} id);",
            names.helper("StateIdToString")
        ));
        w.line(&format!(
            "const char *{}({} id);",
            names.helper("EventIdToString"),
            names.event_enum()
        ));
    }
    w.blank();
}

fn emit_constructor(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block(&format!("void {}({} *self)", names.init_fn, names.type_name));
    w.line(&format!(
        "self->{} = {};",
        names.state_field, names.root_state
    ));
    for history in &names.histories {
        w.line(&format!(
            "self->{} = {};",
            history.field, history.initial_member
        ));
    }
    w.end_block();
    w.blank();
}

/// Escape a diagram name for use inside a C string literal.
fn c_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn emit_string_helpers(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    emit_state_tostring(w, ctx, names);
    emit_event_tostring(w, ctx, names);
}

fn emit_state_tostring(w: &mut CodeWriter, _ctx: &EmitCtx<'_>, names: &Names) {
    w.start_block(&format!(
        "const char *{}({} id)",
        names.helper("StateIdToString"),
        names.state_enum()
    ));
    w.start_block("switch (id)");
    for (member, raw) in names.states.iter().zip(&names.state_raw) {
        w.line(&format!("case {member}:"));
        w.indent();
        w.line(&format!("return \"{}\";", c_escape(raw)));
        w.dedent();
    }
    w.line(&format!("case {}:", names.root_state));
    w.indent();
    w.line("return \"<root>\";");
    w.dedent();
    w.line("default:");
    w.indent();
    w.line("return \"?\";");
    w.dedent();
    w.end_block();
    w.end_block();
    w.blank();
}

fn emit_event_tostring(w: &mut CodeWriter, _ctx: &EmitCtx<'_>, names: &Names) {
    w.start_block(&format!(
        "const char *{}({} id)",
        names.helper("EventIdToString"),
        names.event_enum()
    ));
    w.start_block("switch (id)");
    for (member, raw) in names.events.iter().zip(&names.event_raw) {
        w.line(&format!("case {member}:"));
        w.indent();
        w.line(&format!("return \"{}\";", c_escape(raw)));
        w.dedent();
    }
    w.line("default:");
    w.indent();
    w.line("return \"?\";");
    w.dedent();
    w.end_block();
    w.end_block();
    w.blank();
}
