//! Guard-evaluation and action-execution dispatch blocks.
//!
//! Both are switches over the slot enums. The expander runs here, at
//! emit time; each behavior owns exactly one guard slot and one action
//! slot, so every fragment is expanded at most once.

use crate::expand::Expander;
use crate::writer::CodeWriter;

use super::EmitCtx;

pub(crate) fn emit(w: &mut CodeWriter, ctx: &EmitCtx<'_>, expander: &dyn Expander) {
    emit_guard_evaluator(w, ctx, expander);
    emit_action_executor(w, ctx, expander);
}

fn emit_guard_evaluator(w: &mut CodeWriter, ctx: &EmitCtx<'_>, expander: &dyn Expander) {
    let names = ctx.names;
    w.start_block(&format!(
        "static int {}({} *self, {} idx)",
        names.helper("EvaluateGuard"),
        names.type_name,
        names.guard_enum()
    ));
    w.line("(void)self;");
    w.start_block("switch (idx)");
    w.line(&format!("case {}:", names.guard_none()));
    w.indent();
    w.line("return 1;");
    w.dedent();
    for (i, &behavior_id) in ctx.set.guards.iter().enumerate() {
        let behavior = ctx.hsm.behavior(behavior_id);
        let expanded = expander.expand_guard(behavior);
        w.line(&format!("case {}:", names.guard_member(i as u16 + 1)));
        w.indent();
        w.line(&format!("return ({});", expanded.trim()));
        w.dedent();
    }
    w.line("default:");
    w.indent();
    w.line("return 1;");
    w.dedent();
    w.end_block();
    w.end_block();
    w.blank();
}

fn emit_action_executor(w: &mut CodeWriter, ctx: &EmitCtx<'_>, expander: &dyn Expander) {
    let names = ctx.names;
    w.start_block(&format!(
        "static void {}({} *self, {} idx)",
        names.helper("ExecuteAction"),
        names.type_name,
        names.action_enum()
    ));
    w.line("(void)self;");
    w.start_block("switch (idx)");
    w.line(&format!("case {}:", names.action_none()));
    w.indent();
    w.line("break;");
    w.dedent();
    for (i, &behavior_id) in ctx.set.actions.iter().enumerate() {
        let behavior = ctx.hsm.behavior(behavior_id);
        w.line(&format!("case {}:", names.action_member(i as u16 + 1)));
        w.indent();
        if behavior.has_action() {
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
