//! Name-mangling capability.
//!
//! The emitter never invents target-language identifiers on its own;
//! every user-visible name goes through a [`NameMangler`], and the
//! routine/field names that are not user-visible come from the trait's
//! provided fixed-name methods. [`C99Mangler`] is the default mangler
//! for the C99 sink.

use crate::error::MangleError;
use crate::hsm::HistoryKind;

/// Converts diagram names into target-language identifiers.
///
/// Mangling must be deterministic and injective over the event space;
/// the generator verifies injectivity where masking depends on it and
/// reports a [`MangleError::Collision`] otherwise.
pub trait NameMangler {
    /// The generated state-machine type name.
    fn type_name(&self, machine: &str) -> Result<String, MangleError>;

    /// A member of the generated state enum.
    fn state_enum_value(&self, machine: &str, state: &str) -> Result<String, MangleError>;

    /// A member of the generated event enum.
    fn event_enum_value(&self, machine: &str, trigger: &str) -> Result<String, MangleError>;

    /// A variable name inside the `Vars` sub-struct. Consumed by
    /// expanders that rewrite `$name` references into field accessors
    /// (see [`FieldAccessExpander`]); declaration text itself is
    /// spliced verbatim.
    ///
    /// [`FieldAccessExpander`]: crate::expand::FieldAccessExpander
    fn var_name(&self, name: &str) -> Result<String, MangleError>;

    /// Type name of the per-history enum for `parent`'s region.
    fn history_enum_name(&self, machine: &str, parent: &str) -> Result<String, MangleError>;

    /// A member of the per-history enum: one direct child of `parent`.
    fn history_member(
        &self,
        machine: &str,
        parent: &str,
        child: &str,
    ) -> Result<String, MangleError>;

    /// The history slot field on the instance struct. Shallow and deep
    /// slots get distinct names so one region can carry both.
    fn history_field(&self, parent: &str, kind: HistoryKind) -> Result<String, MangleError>;

    // Fixed names. These are not user-visible, so they carry no
    // failure mode.

    fn init_routine(&self, type_name: &str) -> String {
        format!("{type_name}_Init")
    }

    fn start_routine(&self, type_name: &str) -> String {
        format!("{type_name}_Start")
    }

    fn dispatch_routine(&self, type_name: &str) -> String {
        format!("{type_name}_DispatchEvent")
    }

    fn state_field(&self) -> &'static str {
        "stateId"
    }
}

/// Strip a name down to C identifier characters.
///
/// Non-alphanumeric characters become underscores; a leading digit gets
/// an underscore prefix. Empty (or all-whitespace) input is an error
/// rather than a made-up identifier.
pub fn sanitize(raw: &str, what: &'static str) -> Result<String, MangleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MangleError::Empty { what });
    }
    let mut out = String::with_capacity(trimmed.len() + 1);
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    Ok(out)
}

/// `parent_child` → `ParentChild`.
pub fn to_pascal_case(s: &str) -> String {
    let mut pascal = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            pascal.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            pascal.push(c);
        }
    }
    pascal
}

/// `PlayingVideo` → `PLAYING_VIDEO`; `A1` → `A1`.
pub fn to_upper_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        out.push(c.to_ascii_uppercase());
    }
    out
}

/// `PlayingVideo` → `playing_video`.
pub fn to_snake(s: &str) -> String {
    to_upper_snake(s).to_ascii_lowercase()
}

/// Default mangler for the C99 sink.
///
/// Enum members are `MACHINE_KIND_NAME` upper-snake; type names are
/// PascalCase of the machine name.
#[derive(Debug, Clone, Copy, Default)]
pub struct C99Mangler;

impl C99Mangler {
    fn prefix(&self, machine: &str) -> Result<String, MangleError> {
        Ok(to_upper_snake(&sanitize(machine, "machine")?))
    }
}

impl NameMangler for C99Mangler {
    fn type_name(&self, machine: &str) -> Result<String, MangleError> {
        Ok(to_pascal_case(&sanitize(machine, "machine")?))
    }

    fn state_enum_value(&self, machine: &str, state: &str) -> Result<String, MangleError> {
        Ok(format!(
            "{}_STATE_{}",
            self.prefix(machine)?,
            to_upper_snake(&sanitize(state, "state")?)
        ))
    }

    fn event_enum_value(&self, machine: &str, trigger: &str) -> Result<String, MangleError> {
        Ok(format!(
            "{}_EVENT_{}",
            self.prefix(machine)?,
            to_upper_snake(&sanitize(trigger, "event")?)
        ))
    }

    fn var_name(&self, name: &str) -> Result<String, MangleError> {
        sanitize(name, "variable")
    }

    fn history_enum_name(&self, machine: &str, parent: &str) -> Result<String, MangleError> {
        Ok(format!(
            "{}{}History",
            self.type_name(machine)?,
            to_pascal_case(&sanitize(parent, "state")?)
        ))
    }

    fn history_member(
        &self,
        machine: &str,
        parent: &str,
        child: &str,
    ) -> Result<String, MangleError> {
        Ok(format!(
            "{}_HISTORY_{}_{}",
            self.prefix(machine)?,
            to_upper_snake(&sanitize(parent, "state")?),
            to_upper_snake(&sanitize(child, "state")?)
        ))
    }

    fn history_field(&self, parent: &str, kind: HistoryKind) -> Result<String, MangleError> {
        let pascal = to_pascal_case(&sanitize(parent, "state")?);
        let mut field = String::with_capacity(pascal.len() + 11);
        let mut chars = pascal.chars();
        if let Some(first) = chars.next() {
            field.push(first.to_ascii_lowercase());
        }
        field.extend(chars);
        field.push_str(match kind {
            HistoryKind::Shallow => "History",
            HistoryKind::Deep => "DeepHistory",
        });
        Ok(field)
    }
}
