//! Runtime transition protocol: the dispatcher, the LCA walk, the
//! exit/enter helpers and the per-state lifecycle switches.
//!
//! Everything here is emitted text; the only algorithmic work done at
//! emit time is grouping history slots by their parent state.

use crate::expand::Expander;
use crate::hsm::{BehaviorId, HistoryKind, VertexId, ENTER, EXIT};
use crate::index::StateId;
use crate::writer::CodeWriter;

use super::{EmitCtx, HistoryNames};

/// Defended parent/depth lookups. Out-of-range ids degrade to
/// ROOT/0 so the LCA walk always terminates.
pub(crate) fn emit_state_lookups(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    let state = names.state_enum();

    w.start_block(&format!(
        "static {state} {}({state} id)",
        names.helper("GetStateParent")
    ));
    w.start_block(&format!(
        "if ((int)id < 0 || (int)id >= {})",
        names.state_count_macro()
    ));
    w.line(&format!("return {};", names.root_state));
    w.end_block();
    w.line(&format!("return {}[id];", names.parent_table()));
    w.end_block();
    w.blank();

    w.start_block(&format!(
        "static int {}({state} id)",
        names.helper("GetStateDepth")
    ));
    w.start_block(&format!(
        "if ((int)id < 0 || (int)id >= {})",
        names.state_count_macro()
    ));
    w.line("return 0;");
    w.end_block();
    w.line(&format!("return {}[id];", names.depth_table()));
    w.end_block();
    w.blank();
}

/// Behaviors of `vertex` that run on the given lifecycle trigger and
/// carry action text, declared order.
fn lifecycle_bodies(ctx: &EmitCtx<'_>, vertex: VertexId, trigger: &str) -> Vec<BehaviorId> {
    ctx.hsm
        .behaviors_of(vertex)
        .iter()
        .copied()
        .filter(|&b| {
            let behavior = ctx.hsm.behavior(b);
            !behavior.is_transition()
                && behavior.has_action()
                && behavior.triggers.iter().any(|t| t == trigger)
        })
        .collect()
}

pub(crate) fn emit_lifecycle_switches(
    w: &mut CodeWriter,
    ctx: &EmitCtx<'_>,
    expander: &dyn Expander,
) {
    emit_lifecycle_switch(w, ctx, expander, "CallStateEnter", ENTER);
    emit_lifecycle_switch(w, ctx, expander, "CallStateExit", EXIT);
}

fn emit_lifecycle_switch(
    w: &mut CodeWriter,
    ctx: &EmitCtx<'_>,
    expander: &dyn Expander,
    helper: &str,
    trigger: &str,
) {
    let names = ctx.names;
    w.start_block(&format!(
        "static void {}({} *self, {} id)",
        names.helper(helper),
        names.type_name,
        names.state_enum()
    ));
    w.line("(void)self;");
    w.start_block("switch (id)");
    for (pos, &vertex) in ctx.index.states().iter().enumerate() {
        let bodies = lifecycle_bodies(ctx, vertex, trigger);
        if bodies.is_empty() {
            continue;
        }
        w.line(&format!("case {}:", names.states[pos]));
        w.indent();
        for behavior_id in bodies {
            let behavior = ctx.hsm.behavior(behavior_id);
            w.lines(expander.expand_action(behavior).trim_end());
        }
        w.line("break;");
        w.dedent();
    }
    w.line("default:");
    w.indent();
    w.line("break;");
    w.dedent();
    w.end_block();
    w.end_block();
    w.blank();
}

/// History slots grouped by parent state, preserving slot order.
fn histories_by_parent<'a>(ctx: &'a EmitCtx<'_>) -> Vec<(StateId, Vec<&'a HistoryNames>)> {
    let mut grouped: Vec<(StateId, Vec<&HistoryNames>)> = Vec::new();
    for history in &ctx.names.histories {
        match grouped.iter_mut().find(|(p, _)| *p == history.parent) {
            Some((_, slots)) => slots.push(history),
            None => grouped.push((history.parent, vec![history])),
        }
    }
    grouped
}

pub(crate) fn emit_transition_protocol(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    emit_exit_up_to(w, ctx);
    emit_enter_down_to(w, ctx);
    emit_perform_transition(w, ctx);
}

fn emit_exit_up_to(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    let state = names.state_enum();
    let grouped = histories_by_parent(ctx);

    w.start_block(&format!(
        "static void {}({} *self, {state} from, {state} lca)",
        names.helper("ExitUpTo"),
        names.type_name
    ));
    w.line(&format!("{state} s = from;"));
    w.start_block("while (s != lca)");
    if grouped.is_empty() {
        w.line(&format!("{}(self, s);", names.helper("CallStateExit")));
        w.line(&format!("s = {}(s);", names.helper("GetStateParent")));
    } else {
        w.line(&format!(
            "{state} p = {}(s);",
            names.helper("GetStateParent")
        ));
        w.line(&format!("{}(self, s);", names.helper("CallStateExit")));
        w.start_block("switch (p)");
        for (parent, slots) in &grouped {
            w.line(&format!("case {}:", names.state_member(*parent)));
            w.indent();
            for history in slots {
                match history.kind {
                    // Shallow: the direct child just exited.
                    HistoryKind::Shallow => w.line(&format!(
                        "self->{} = ({})s;",
                        history.field, history.enum_name
                    )),
                    // Deep: the innermost state this exit started from.
                    HistoryKind::Deep => {
                        w.line(&format!("self->{} = from;", history.field));
                    }
                }
            }
            w.line("break;");
            w.dedent();
        }
        w.line("default:");
        w.indent();
        w.line("break;");
        w.dedent();
        w.end_block();
        w.line("s = p;");
    }
    w.end_block();
    w.end_block();
    w.blank();
}

fn emit_enter_down_to(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    let state = names.state_enum();
    w.start_block(&format!(
        "static void {}({} *self, {state} lca, {state} to)",
        names.helper("EnterDownTo"),
        names.type_name
    ));
    w.line(&format!(
        "{state} path[{} + 1];",
        names.max_depth_macro()
    ));
    w.line("int top = 0;");
    w.line(&format!("{state} s = to;"));
    w.start_block("while (s != lca)");
    w.line("path[top] = s;");
    w.line("top = top + 1;");
    w.line(&format!("s = {}(s);", names.helper("GetStateParent")));
    w.end_block();
    w.start_block("while (top > 0)");
    w.line("top = top - 1;");
    w.line(&format!("{}(self, path[top]);", names.helper("CallStateEnter")));
    w.end_block();
    w.end_block();
    w.blank();
}

fn emit_perform_transition(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    let state = names.state_enum();
    w.start_block(&format!(
        "static void {}({} *self, {state} from, {state} to, {} actionIdx)",
        names.helper("PerformTransition"),
        names.type_name,
        names.action_enum()
    ));
    w.line(&format!("{state} a;"));
    w.line(&format!("{state} b;"));
    w.start_block("if (from == to)");
    w.line(&format!("{}(self, from);", names.helper("CallStateExit")));
    w.line(&format!("{}(self, actionIdx);", names.helper("ExecuteAction")));
    w.line(&format!("{}(self, to);", names.helper("CallStateEnter")));
    w.line(&format!("self->{} = to;", names.state_field));
    emit_do_redispatch(w, ctx);
    w.line("return;");
    w.end_block();
    w.line("a = from;");
    w.line("b = to;");
    w.start_block(&format!(
        "while ({depth}(a) > {depth}(b))",
        depth = names.helper("GetStateDepth")
    ));
    w.line(&format!("a = {}(a);", names.helper("GetStateParent")));
    w.end_block();
    w.start_block(&format!(
        "while ({depth}(b) > {depth}(a))",
        depth = names.helper("GetStateDepth")
    ));
    w.line(&format!("b = {}(b);", names.helper("GetStateParent")));
    w.end_block();
    w.start_block("while (a != b)");
    w.line(&format!("a = {}(a);", names.helper("GetStateParent")));
    w.line(&format!("b = {}(b);", names.helper("GetStateParent")));
    w.end_block();
    // The transition leaves the meeting state's region: a sibling
    // transition exits and re-enters the shared parent. Above the
    // top level the defended parent lookup pins this at ROOT.
    w.line(&format!("a = {}(a);", names.helper("GetStateParent")));
    w.line(&format!("{}(self, from, a);", names.helper("ExitUpTo")));
    w.line(&format!("{}(self, actionIdx);", names.helper("ExecuteAction")));
    w.line(&format!("{}(self, a, to);", names.helper("EnterDownTo")));
    w.line(&format!("self->{} = to;", names.state_field));
    emit_do_redispatch(w, ctx);
    w.end_block();
    w.blank();
}

fn emit_do_redispatch(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    if !ctx.index.uses_do() {
        return;
    }
    let names = ctx.names;
    let do_member = ctx
        .index
        .event_id(crate::hsm::DO)
        .map(|id| names.event_member(id).to_string())
        .expect("uses_do implies an indexed DO event");
    w.line(&format!("{}(self, {});", names.dispatch_fn, do_member));
}

pub(crate) fn emit_dispatcher(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    let table = names.transitions_table();
    w.start_block(&format!(
        "void {}({} *self, {} event)",
        names.dispatch_fn,
        names.type_name,
        names.event_enum()
    ));
    w.line("int i;");
    w.start_block(&format!(
        "for (i = 0; i < {}; i = i + 1)",
        names.transition_count_macro()
    ));
    w.start_block(&format!(
        "if ({table}[i].currentState != self->{})",
        names.state_field
    ));
    w.line("continue;");
    w.end_block();
    w.start_block(&format!("if ({table}[i].trigger != event)"));
    w.line("continue;");
    w.end_block();
    w.start_block(&format!(
        "if ({table}[i].guardIndex != {})",
        names.guard_none()
    ));
    w.start_block(&format!(
        "if (!{}(self, {table}[i].guardIndex))",
        names.helper("EvaluateGuard")
    ));
    w.line("continue;");
    w.end_block();
    w.end_block();
    w.line(&format!(
        "{}(self, self->{}, {table}[i].nextState, {table}[i].actionIndex);",
        names.helper("PerformTransition"),
        names.state_field
    ));
    w.line("return;");
    w.end_block();
    w.end_block();
    w.blank();
}

pub(crate) fn emit_start(w: &mut CodeWriter, ctx: &EmitCtx<'_>, expander: &dyn Expander) {
    let names = ctx.names;
    w.start_block(&format!(
        "void {}({} *self)",
        names.start_fn, names.type_name
    ));
    for behavior_id in lifecycle_bodies(ctx, crate::hsm::Hsm::ROOT, ENTER) {
        let behavior = ctx.hsm.behavior(behavior_id);
        w.lines(expander.expand_action(behavior).trim_end());
    }
    let initial = ctx.root_initial_behavior();
    if initial.has_action() {
        w.lines(expander.expand_action(initial).trim_end());
    }
    let target = names.state_member(ctx.root_initial_target()).to_string();
    w.line(&format!("self->{} = {};", names.state_field, target));
    w.line(&format!(
        "{}(self, {}, {});",
        names.helper("EnterDownTo"),
        names.root_state,
        target
    ));
    emit_do_redispatch(w, ctx);
    w.end_block();
    w.blank();
}
