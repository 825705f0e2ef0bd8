//! Structural constant tables: `transitions[]`, `state_parent[]`,
//! `state_depth[]`, all indexed by state id.

use crate::hsm::Hsm;
use crate::writer::CodeWriter;

use super::EmitCtx;

pub(crate) fn emit(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    emit_transition_table(w, ctx);
    emit_parent_table(w, ctx);
    emit_depth_table(w, ctx);
}

fn emit_transition_table(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    if ctx.set.entries.is_empty() {
        // A zero-length array is not legal C; the dispatcher scans
        // TRANSITION_COUNT == 0 entries, so the row is never read.
        w.start_block(&format!(
            "static const {}Transition {}[1] =",
            names.type_name,
            names.transitions_table()
        ));
        w.line(&format!(
            "{{ {}, {}, {}, {}, {} }},",
            names.root_state,
            names.event_count_member(),
            names.root_state,
            names.action_none(),
            names.guard_none()
        ));
        w.close_block("};");
        w.blank();
        return;
    }

    w.start_block(&format!(
        "static const {}Transition {}[{}] =",
        names.type_name,
        names.transitions_table(),
        names.transition_count_macro()
    ));
    for entry in &ctx.set.entries {
        w.line(&format!(
            "{{ {}, {}, {}, {}, {} }},",
            names.state_member(entry.current),
            names.event_member(entry.trigger),
            names.state_member(entry.next),
            names.action_member(entry.action),
            names.guard_member(entry.guard)
        ));
    }
    w.close_block("};");
    w.blank();
}

fn emit_parent_table(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block(&format!(
        "static const {} {}[{}] =",
        names.state_enum(),
        names.parent_table(),
        names.state_count_macro()
    ));
    for (pos, &vertex) in ctx.index.states().iter().enumerate() {
        let state = ctx.hsm.state(vertex);
        let parent = if state.parent == Hsm::ROOT {
            names.root_state.clone()
        } else {
            let parent_id = ctx
                .index
                .state_id(state.parent)
                .expect("parent of an indexed state is indexed");
            names.state_member(parent_id).to_string()
        };
        w.line(&format!("{parent}, /* {} */", names.state_raw[pos]));
    }
    w.close_block("};");
    w.blank();
}

fn emit_depth_table(w: &mut CodeWriter, ctx: &EmitCtx<'_>) {
    let names = ctx.names;
    w.start_block(&format!(
        "static const int {}[{}] =",
        names.depth_table(),
        names.state_count_macro()
    ));
    for (pos, &vertex) in ctx.index.states().iter().enumerate() {
        let depth = ctx.hsm.state(vertex).depth;
        w.line(&format!("{depth}, /* {} */", names.state_raw[pos]));
    }
    w.close_block("};");
    w.blank();
}
