// flatchart-core/tests/generator_integration_test.rs
//
// End-to-end emission scenarios: build a machine, generate the C99
// unit, assert on the emitted tables and routines.

use flatchart_core::{
    C99Mangler, FieldAccessExpander, GenerateError, HistoryKind, Hsm, HsmBuilder, RenderConfig,
    TableCodeGenerator,
};

fn generate(hsm: &Hsm) -> String {
    let mut generator = TableCodeGenerator::with_defaults(RenderConfig::new());
    generator.bind(hsm).generate().expect("generation succeeds")
}

/// Assert that `needles` appear in `haystack` in the given order.
fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(pos) => from += pos + needle.len(),
            None => panic!(
                "expected to find '{needle}' (in order) in generated output:\n{haystack}"
            ),
        }
    }
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.match_indices(needle).count()
}

// S1: flat two-state machine, one transition.
#[test]
fn flat_two_state_machine() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    let z = b.state(Hsm::ROOT, "B");
    b.initial(Hsm::ROOT, a, None);
    b.event("GO");
    b.transition(a, &["GO"], None, None, z);
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "GATE_STATE_A = 0,",
            "GATE_STATE_B = 1,",
            "GATE_STATE_ROOT = 2",
            "GATE_EVENT_GO = 0,",
            "GATE_EVENT_COUNT = 1",
            "#define GATE_STATE_COUNT 2",
            "#define GATE_TRANSITION_COUNT 1",
            "{ GATE_STATE_A, GATE_EVENT_GO, GATE_STATE_B, GATE_ACTION_1, GATE_GUARD_NONE },",
        ],
    );

    // Exactly one table row: a second GO in state B has nothing to match.
    assert_eq!(count_occurrences(&out, "{ GATE_STATE_A, GATE_EVENT_GO"), 1);
    assert_eq!(count_occurrences(&out, "{ GATE_STATE_B,"), 0);

    // The start routine enters A and never dispatches DO.
    assert_in_order(
        &out,
        &[
            "void Gate_Start(Gate *self)",
            "self->stateId = GATE_STATE_A;",
            "Gate_EnterDownTo(self, GATE_STATE_ROOT, GATE_STATE_A);",
        ],
    );
    assert!(!out.contains("GATE_EVENT_DO"));
}

// S2: a failing guard leaves the table row guarded, not absent.
#[test]
fn guarded_transition_emits_guard_case() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    let z = b.state(Hsm::ROOT, "B");
    b.initial(Hsm::ROOT, a, None);
    b.event("GO");
    b.variables("int x;");
    b.transition(a, &["GO"], Some("self->vars.x == 1"), None, z);
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "{ GATE_STATE_A, GATE_EVENT_GO, GATE_STATE_B, GATE_ACTION_1, GATE_GUARD_1 },",
            "static int Gate_EvaluateGuard(Gate *self, GateGuardId idx)",
            "case GATE_GUARD_NONE:",
            "return 1;",
            "case GATE_GUARD_1:",
            "return (self->vars.x == 1);",
        ],
    );

    // The dispatcher consults the guard before performing.
    assert_in_order(
        &out,
        &[
            "void Gate_DispatchEvent(Gate *self, GateEventId event)",
            "if (gate_transitions[i].guardIndex != GATE_GUARD_NONE)",
            "if (!Gate_EvaluateGuard(self, gate_transitions[i].guardIndex))",
            "continue;",
            "Gate_PerformTransition(self, self->stateId, gate_transitions[i].nextState, gate_transitions[i].actionIndex);",
        ],
    );
}

// S3: a parent-level transition is pre-expanded into every descendant.
#[test]
fn inherited_transition_rows_are_pre_expanded() {
    let mut b = HsmBuilder::new("gate");
    let p = b.state(Hsm::ROOT, "P");
    let c1 = b.state(p, "C1");
    b.state(p, "C2");
    b.initial(Hsm::ROOT, p, None);
    b.initial(p, c1, None);
    b.event("RESET");
    b.transition(p, &["RESET"], None, None, c1);
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "#define GATE_TRANSITION_COUNT 3",
            "{ GATE_STATE_P, GATE_EVENT_RESET, GATE_STATE_C1, GATE_ACTION_1, GATE_GUARD_NONE },",
            "{ GATE_STATE_C1, GATE_EVENT_RESET, GATE_STATE_C1, GATE_ACTION_1, GATE_GUARD_NONE },",
            "{ GATE_STATE_C2, GATE_EVENT_RESET, GATE_STATE_C1, GATE_ACTION_1, GATE_GUARD_NONE },",
        ],
    );

    // Children index their parent in the structural tables.
    assert_in_order(
        &out,
        &[
            "gate_state_parent[GATE_STATE_COUNT]",
            "GATE_STATE_ROOT, /* P */",
            "GATE_STATE_P, /* C1 */",
            "GATE_STATE_P, /* C2 */",
            "gate_state_depth[GATE_STATE_COUNT]",
            "1, /* P */",
            "2, /* C1 */",
            "2, /* C2 */",
        ],
    );
}

// S4: transition across branches; the runtime walks to the LCA using
// the emitted depth/parent tables.
#[test]
fn cross_branch_transition_and_lca_walk() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    let a1 = b.state(a, "A1");
    let bb = b.state(Hsm::ROOT, "B");
    let b1 = b.state(bb, "B1");
    b.initial(Hsm::ROOT, a, None);
    b.initial(a, a1, None);
    b.initial(bb, b1, None);
    b.event("X");
    b.transition(a1, &["X"], None, None, b1);
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "{ GATE_STATE_A1, GATE_EVENT_X, GATE_STATE_B1, GATE_ACTION_1, GATE_GUARD_NONE },",
        ],
    );

    // LCA protocol: equalize depths, walk up together, then exit
    // before acting and entering.
    assert_in_order(
        &out,
        &[
            "static void Gate_PerformTransition(Gate *self, GateStateId from, GateStateId to, GateActionId actionIdx)",
            "while (Gate_GetStateDepth(a) > Gate_GetStateDepth(b))",
            "a = Gate_GetStateParent(a);",
            "while (Gate_GetStateDepth(b) > Gate_GetStateDepth(a))",
            "b = Gate_GetStateParent(b);",
            "while (a != b)",
            "b = Gate_GetStateParent(b);",
            "a = Gate_GetStateParent(a);",
            "Gate_ExitUpTo(self, from, a);",
            "Gate_ExecuteAction(self, actionIdx);",
            "Gate_EnterDownTo(self, a, to);",
            "self->stateId = to;",
        ],
    );

    // Fixed-capacity enter path buffer sized from the deepest state.
    assert_in_order(
        &out,
        &[
            "#define GATE_MAX_DEPTH 2",
            "GateStateId path[GATE_MAX_DEPTH + 1];",
        ],
    );
}

// S5: self-transition takes the exit/action/enter fast path.
#[test]
fn self_transition_fast_path() {
    let mut b = HsmBuilder::new("gate");
    let s = b.state(Hsm::ROOT, "S");
    b.initial(Hsm::ROOT, s, None);
    b.event("E");
    b.on_enter(s, "n = n + 1;");
    b.on_exit(s, "n = n - 1;");
    b.transition(s, &["E"], None, None, s);
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "{ GATE_STATE_S, GATE_EVENT_E, GATE_STATE_S, GATE_ACTION_1, GATE_GUARD_NONE },",
            "if (from == to)",
            "Gate_CallStateExit(self, from);",
            "Gate_ExecuteAction(self, actionIdx);",
            "Gate_CallStateEnter(self, to);",
            "self->stateId = to;",
            "return;",
        ],
    );

    // Lifecycle bodies land in the per-state switches.
    assert_in_order(
        &out,
        &[
            "static void Gate_CallStateEnter(Gate *self, GateStateId id)",
            "case GATE_STATE_S:",
            "n = n + 1;",
            "break;",
        ],
    );
    assert_in_order(
        &out,
        &[
            "static void Gate_CallStateExit(Gate *self, GateStateId id)",
            "case GATE_STATE_S:",
            "n = n - 1;",
            "break;",
        ],
    );
}

// S6: a used DO event is re-dispatched by start and after transitions.
#[test]
fn do_completion_event_is_dispatched() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    let z = b.state(Hsm::ROOT, "B");
    b.initial(Hsm::ROOT, a, None);
    b.event("DO");
    b.transition(a, &["DO"], None, None, z);
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "void Gate_Start(Gate *self)",
            "self->stateId = GATE_STATE_A;",
            "Gate_EnterDownTo(self, GATE_STATE_ROOT, GATE_STATE_A);",
            "Gate_DispatchEvent(self, GATE_EVENT_DO);",
        ],
    );

    // Both PerformTransition paths re-dispatch DO after settling. The
    // definition header ends in `actionIdx) {`, unlike the prototype.
    let perform = out
        .split("GateActionId actionIdx) {")
        .nth(1)
        .and_then(|rest| rest.split("void Gate_DispatchEvent(Gate *self, GateEventId event) {").next())
        .expect("PerformTransition body present");
    assert_eq!(
        count_occurrences(perform, "Gate_DispatchEvent(self, GATE_EVENT_DO);"),
        2
    );
}

#[test]
fn history_slot_enum_field_and_exit_update() {
    let mut b = HsmBuilder::new("gate");
    let mode = b.state(Hsm::ROOT, "Mode");
    let slow = b.state(mode, "Slow");
    let fast = b.state(mode, "Fast");
    let idle = b.state(Hsm::ROOT, "Idle");
    b.initial(Hsm::ROOT, mode, None);
    b.initial(mode, slow, None);
    b.history(mode, HistoryKind::Shallow);
    b.event("SWAP");
    b.event("PARK");
    b.transition(slow, &["SWAP"], None, None, fast);
    b.transition(mode, &["PARK"], None, None, idle);
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "typedef enum",
            "GATE_HISTORY_MODE_SLOW = 1,",
            "GATE_HISTORY_MODE_FAST = 2",
            "} GateModeHistory;",
        ],
    );
    assert_in_order(
        &out,
        &[
            "GateModeHistory modeHistory;",
            "void Gate_Init(Gate *self)",
            "self->stateId = GATE_STATE_ROOT;",
            "self->modeHistory = GATE_HISTORY_MODE_SLOW;",
        ],
    );
    // Exiting a direct child of Mode records it in the slot.
    assert_in_order(
        &out,
        &[
            "static void Gate_ExitUpTo(Gate *self, GateStateId from, GateStateId lca)",
            "GateStateId p = Gate_GetStateParent(s);",
            "Gate_CallStateExit(self, s);",
            "case GATE_STATE_MODE:",
            "self->modeHistory = (GateModeHistory)s;",
            "break;",
            "s = p;",
        ],
    );
}

#[test]
fn deep_history_slot_records_innermost_exited_state() {
    let mut b = HsmBuilder::new("gate");
    let mode = b.state(Hsm::ROOT, "Mode");
    let slow = b.state(mode, "Slow");
    let crawl = b.state(slow, "Crawl");
    b.state(mode, "Fast");
    let idle = b.state(Hsm::ROOT, "Idle");
    b.initial(Hsm::ROOT, mode, None);
    b.initial(mode, slow, None);
    b.initial(slow, crawl, None);
    b.history(mode, HistoryKind::Deep);
    b.event("PARK");
    b.transition(mode, &["PARK"], None, None, idle);
    let out = generate(&b.finish().expect("valid machine"));

    // No bespoke enum: the deep slot is typed by the state enum and
    // defaults to the region's first child.
    assert!(!out.contains("GateModeHistory"));
    assert_in_order(
        &out,
        &[
            "GateStateId modeDeepHistory;",
            "void Gate_Init(Gate *self)",
            "self->modeDeepHistory = GATE_STATE_SLOW;",
        ],
    );
    // Exiting Mode's subtree records the state the exit started from,
    // not the direct child.
    assert_in_order(
        &out,
        &[
            "static void Gate_ExitUpTo(Gate *self, GateStateId from, GateStateId lca)",
            "case GATE_STATE_MODE:",
            "self->modeDeepHistory = from;",
            "break;",
        ],
    );
}

#[test]
fn variable_references_expand_into_field_accessors() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    let z = b.state(Hsm::ROOT, "B");
    b.initial(Hsm::ROOT, a, None);
    b.event("GO");
    b.variables("int speed;");
    b.transition(a, &["GO"], Some("$speed > 10"), Some("$speed = 0;"), z);
    let hsm = b.finish().expect("valid machine");

    let mut generator = TableCodeGenerator::new(
        RenderConfig::new(),
        C99Mangler,
        FieldAccessExpander::new(C99Mangler),
    );
    let out = generator.bind(&hsm).generate().expect("generation succeeds");

    assert_in_order(
        &out,
        &[
            "case GATE_GUARD_1:",
            "return (self->vars.speed > 10);",
            "case GATE_ACTION_1:",
            "self->vars.speed = 0;",
            "break;",
        ],
    );
}

#[test]
fn vars_struct_merges_machine_and_config_declarations() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    b.initial(Hsm::ROOT, a, None);
    b.variables("int pressure;\nint ticks;");
    let hsm = b.finish().expect("valid machine");

    let mut config = RenderConfig::new();
    config
        .variable_declarations
        .push("int fromConfig;".to_string());
    let mut generator = TableCodeGenerator::with_defaults(config);
    let out = generator.bind(&hsm).generate().expect("generation succeeds");

    assert_in_order(
        &out,
        &[
            "typedef struct",
            "int pressure;",
            "int ticks;",
            "int fromConfig;",
            "} GateVars;",
            "GateVars vars;",
        ],
    );
}

#[test]
fn string_helpers_report_original_names() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "DeepSleep");
    b.initial(Hsm::ROOT, a, None);
    b.event("wake up");
    let out = generate(&b.finish().expect("valid machine"));

    assert_in_order(
        &out,
        &[
            "const char *Gate_StateIdToString(GateStateId id)",
            "case GATE_STATE_DEEP_SLEEP:",
            "return \"DeepSleep\";",
            "case GATE_STATE_ROOT:",
            "return \"<root>\";",
            "const char *Gate_EventIdToString(GateEventId id)",
            "case GATE_EVENT_WAKE_UP:",
            "return \"wake up\";",
        ],
    );
}

#[test]
fn string_helpers_can_be_disabled() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    b.initial(Hsm::ROOT, a, None);
    let hsm = b.finish().expect("valid machine");

    let mut config = RenderConfig::new();
    config.string_helpers = false;
    let mut generator = TableCodeGenerator::with_defaults(config);
    let out = generator.bind(&hsm).generate().expect("generation succeeds");
    assert!(!out.contains("StateIdToString"));
    assert!(!out.contains("EventIdToString"));
}

#[test]
fn generate_before_bind_is_an_error() {
    let generator = TableCodeGenerator::with_defaults(RenderConfig::new());
    assert_eq!(
        generator.generate().expect_err("unbound generator"),
        GenerateError::NullStateMachine
    );
}

#[test]
fn missing_root_initial_is_an_error() {
    let mut b = HsmBuilder::new("gate");
    b.state(Hsm::ROOT, "A");
    let hsm = b.finish().expect("builds without initial");
    let mut generator = TableCodeGenerator::with_defaults(RenderConfig::new());
    let err = generator.bind(&hsm).generate().expect_err("no initial");
    assert_eq!(
        err,
        GenerateError::MissingInitialState {
            machine: "gate".to_string(),
        }
    );
}

#[test]
fn orthogonal_regions_are_rejected_by_name() {
    let mut b = HsmBuilder::new("gate");
    let a = b.state(Hsm::ROOT, "A");
    let par = b.state(Hsm::ROOT, "Split");
    b.state(par, "Left");
    b.state(par, "Right");
    b.orthogonal(par);
    b.initial(Hsm::ROOT, a, None);
    let hsm = b.finish().expect("valid machine");
    let mut generator = TableCodeGenerator::with_defaults(RenderConfig::new());
    let err = generator.bind(&hsm).generate().expect_err("orthogonal");
    assert_eq!(
        err,
        GenerateError::OrthogonalRegions {
            state: "Split".to_string(),
        }
    );
}

#[test]
fn emission_is_deterministic() {
    let mut b = HsmBuilder::new("gate");
    let p = b.state(Hsm::ROOT, "P");
    let c1 = b.state(p, "C1");
    let c2 = b.state(p, "C2");
    b.initial(Hsm::ROOT, p, None);
    b.initial(p, c1, None);
    b.history(p, HistoryKind::Shallow);
    b.event("E");
    b.event("F");
    b.transition(c1, &["E"], Some("g > 0"), Some("g = 0;"), c2);
    b.transition(p, &["F"], None, None, c1);
    let hsm = b.finish().expect("valid machine");

    assert_eq!(generate(&hsm), generate(&hsm));
}
