//! Transition collection: flattening the hierarchy into table rows.
//!
//! Every named state gets one row per trigger it reacts to, with
//! transitions inherited from ancestors pre-expanded into the
//! descendant's rows. After this pass the generated dispatcher never
//! has to look at a parent state.
//!
//! Masking compares *mangled* trigger names, matching what the
//! generated event enum can distinguish; the declared event set is
//! checked for mangling collisions up front so masking stays sound.

use std::collections::{HashMap, HashSet};

use crate::error::GenerateError;
use crate::hsm::{Behavior, BehaviorId, Hsm, Vertex, ENTER, EXIT};
use crate::index::{EventId, IndexTables, StateId};
use crate::mangle::NameMangler;

/// One row of the flat transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEntry {
    pub current: StateId,
    pub trigger: EventId,
    pub next: StateId,
    /// Action slot, `>= 1` for every transition row (0 is reserved for
    /// the no-op case of initial/history paths).
    pub action: u16,
    /// Guard slot, 0 when the behavior has no guard.
    pub guard: u16,
    /// True when the row was inherited from an ancestor.
    pub inherited: bool,
    /// The behavior the row came from; shared across rows when one
    /// behavior lists several triggers or is inherited many times.
    pub behavior: BehaviorId,
}

/// Ordered rows plus the guard/action slot tables they refer to.
#[derive(Debug)]
pub struct TransitionSet {
    pub entries: Vec<TransitionEntry>,
    /// Slot `i + 1` → behavior whose guard text fills that case.
    pub guards: Vec<BehaviorId>,
    /// Slot `i + 1` → behavior whose action text fills that case.
    pub actions: Vec<BehaviorId>,
}

impl TransitionSet {
    /// Rows for one state, table order.
    pub fn rows_for(&self, state: StateId) -> impl Iterator<Item = &TransitionEntry> + '_ {
        self.entries.iter().filter(move |e| e.current == state)
    }
}

/// Guard/action slot assignment, deduplicated by behavior identity.
struct SlotRegistry {
    guards: Vec<BehaviorId>,
    actions: Vec<BehaviorId>,
    by_behavior: Vec<Option<(u16, u16)>>,
}

impl SlotRegistry {
    fn new(behavior_count: usize) -> Self {
        SlotRegistry {
            guards: Vec::new(),
            actions: Vec::new(),
            by_behavior: vec![None; behavior_count],
        }
    }

    /// Ids for a transition behavior, assigned on first encounter.
    ///
    /// A guard slot is only spent when guard text is present; an action
    /// slot is spent unconditionally, empty action text included, so
    /// the table layout stays stable for downstream consumers.
    fn register(&mut self, id: BehaviorId, behavior: &Behavior) -> (u16, u16) {
        if let Some(slots) = self.by_behavior[id.0] {
            return slots;
        }
        let guard = if behavior.has_guard() {
            self.guards.push(id);
            self.guards.len() as u16
        } else {
            0
        };
        self.actions.push(id);
        let action = self.actions.len() as u16;
        self.by_behavior[id.0] = Some((guard, action));
        (guard, action)
    }
}

/// Collect every transition row for the machine.
///
/// # Errors
/// Propagates mangling failures, including collisions between distinct
/// declared events.
pub fn collect<M: NameMangler>(
    hsm: &Hsm,
    index: &IndexTables,
    mangler: &M,
) -> Result<TransitionSet, GenerateError> {
    let event_by_mangled = mangle_event_table(hsm, index, mangler)?;

    let mut slots = SlotRegistry::new(hsm.behavior_count());
    let mut entries = Vec::new();

    for (pos, &vertex) in index.states().iter().enumerate() {
        let current = StateId(pos as u16);
        let mut handled: HashSet<String> = HashSet::new();

        // The state's own transitions, declared order. Duplicate
        // triggers all land in the table; the linear dispatcher picks
        // the first whose guard passes.
        for &bid in hsm.behaviors_of(vertex) {
            let behavior = hsm.behavior(bid);
            if !behavior.is_transition() {
                continue;
            }
            for trigger in &behavior.triggers {
                let Some((mangled, event)) =
                    resolve_trigger(hsm, mangler, &event_by_mangled, trigger)?
                else {
                    continue;
                };
                let Some(next) = behavior.target.and_then(|t| index.state_id(t)) else {
                    log::warn!(
                        "transition on '{}' targets a non-state vertex; row skipped",
                        hsm.vertex_name(vertex)
                    );
                    continue;
                };
                let (guard, action) = slots.register(bid, behavior);
                entries.push(TransitionEntry {
                    current,
                    trigger: event,
                    next,
                    action,
                    guard,
                    inherited: false,
                    behavior: bid,
                });
                handled.insert(mangled);
            }
        }

        // Ancestor walk, strictly bottom-up; the nearest ancestor that
        // declares a trigger wins and masks everything above it.
        let mut ancestor = match hsm.vertex(vertex) {
            Vertex::State(s) => s.parent,
            _ => continue,
        };
        while ancestor != Hsm::ROOT {
            for &bid in hsm.behaviors_of(ancestor) {
                let behavior = hsm.behavior(bid);
                if !behavior.is_transition() {
                    continue;
                }
                for trigger in &behavior.triggers {
                    let Some((mangled, event)) =
                        resolve_trigger(hsm, mangler, &event_by_mangled, trigger)?
                    else {
                        continue;
                    };
                    if handled.contains(&mangled) {
                        continue;
                    }
                    let Some(next) = behavior.target.and_then(|t| index.state_id(t)) else {
                        continue;
                    };
                    let (guard, action) = slots.register(bid, behavior);
                    entries.push(TransitionEntry {
                        current,
                        trigger: event,
                        next,
                        action,
                        guard,
                        inherited: true,
                        behavior: bid,
                    });
                    handled.insert(mangled);
                }
            }
            ancestor = hsm.state(ancestor).parent;
        }
    }

    log::debug!(
        "collected {} transition rows, {} guard slots, {} action slots for '{}'",
        entries.len(),
        slots.guards.len(),
        slots.actions.len(),
        hsm.name()
    );
    Ok(TransitionSet {
        entries,
        guards: slots.guards,
        actions: slots.actions,
    })
}

/// Mangle the declared event set once and verify injectivity.
fn mangle_event_table<M: NameMangler>(
    hsm: &Hsm,
    index: &IndexTables,
    mangler: &M,
) -> Result<HashMap<String, EventId>, GenerateError> {
    let mut by_mangled: HashMap<String, EventId> = HashMap::new();
    for (pos, name) in index.events().iter().enumerate() {
        let mangled = mangler.event_enum_value(hsm.name(), name)?;
        if let Some(&existing) = by_mangled.get(&mangled) {
            return Err(crate::error::MangleError::Collision {
                first: index.events()[existing.0 as usize].clone(),
                second: name.clone(),
                mangled,
            }
            .into());
        }
        by_mangled.insert(mangled, EventId(pos as u16));
    }
    Ok(by_mangled)
}

/// Map a raw trigger name to its event id via the mangled event table.
///
/// Lifecycle triggers are silently skipped (they are never
/// transitions); undeclared triggers are skipped with a warning.
fn resolve_trigger<M: NameMangler>(
    hsm: &Hsm,
    mangler: &M,
    event_by_mangled: &HashMap<String, EventId>,
    trigger: &str,
) -> Result<Option<(String, EventId)>, GenerateError> {
    if trigger == ENTER || trigger == EXIT {
        return Ok(None);
    }
    let mangled = mangler.event_enum_value(hsm.name(), trigger)?;
    match event_by_mangled.get(&mangled) {
        Some(&event) => Ok(Some((mangled, event))),
        None => {
            log::warn!("trigger '{trigger}' is not a declared event; row skipped");
            Ok(None)
        }
    }
}
