//! Error types for table emission.
//!
//! All failures are terminal: the generator never retries, and every
//! diagnostic names the offending state by its original (pre-mangled)
//! name so it can be traced back to the source diagram.

/// Error produced while mangling a user-visible name into a C99
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MangleError {
    /// The input name was empty or all-whitespace.
    Empty {
        /// What kind of name was being mangled ("state", "event", ...).
        what: &'static str,
    },
    /// Two distinct input names sanitized to the same identifier.
    ///
    /// Sanitization must stay injective over the event space or
    /// inheritance masking collapses distinct events.
    Collision {
        first: String,
        second: String,
        mangled: String,
    },
}

impl core::fmt::Display for MangleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MangleError::Empty { what } => {
                write!(f, "cannot mangle an empty {what} name")
            }
            MangleError::Collision {
                first,
                second,
                mangled,
            } => {
                write!(
                    f,
                    "names '{first}' and '{second}' both mangle to '{mangled}'"
                )
            }
        }
    }
}

impl std::error::Error for MangleError {}

/// Error produced by [`TableCodeGenerator::generate`].
///
/// [`TableCodeGenerator::generate`]: crate::codegen::TableCodeGenerator::generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// `generate` was called before a state machine was bound.
    NullStateMachine,
    /// The root has no initial pseudostate, or its target does not
    /// resolve to a named state.
    MissingInitialState {
        /// Original name of the machine whose root is missing its
        /// initial state.
        machine: String,
    },
    /// The machine contains an orthogonal (parallel) region, which the
    /// flat-table algorithm cannot express.
    OrthogonalRegions {
        /// Original name of the offending state.
        state: String,
    },
    /// The name mangler rejected a name.
    Mangle(MangleError),
}

impl core::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GenerateError::NullStateMachine => {
                write!(f, "no state machine bound to the generator")
            }
            GenerateError::MissingInitialState { machine } => {
                write!(
                    f,
                    "state machine '{machine}' has no initial state at the root"
                )
            }
            GenerateError::OrthogonalRegions { state } => {
                write!(
                    f,
                    "state '{state}' declares orthogonal regions, which the table generator does not support"
                )
            }
            GenerateError::Mangle(err) => write!(f, "name mangling failed: {err}"),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::Mangle(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MangleError> for GenerateError {
    fn from(err: MangleError) -> Self {
        GenerateError::Mangle(err)
    }
}
