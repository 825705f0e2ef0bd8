//! Render configuration for a single emission run.

/// Code-generation algorithm selector.
///
/// Only the flat-table algorithm is implemented; the variant exists so
/// the configuration surface matches the tool's option grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Single pre-expanded transition table plus a linear-search
    /// dispatcher.
    #[default]
    Table1,
}

/// Target-language sink for guard/action text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpiler {
    /// Freestanding C99: one translation unit, no includes, no
    /// dynamic allocation.
    #[default]
    C99,
}

/// Options controlling one emission run.
///
/// There are no environment variables and no on-disk state; everything
/// the generator honors is in this value.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub algorithm: Algorithm,
    pub transpiler: Transpiler,
    /// Extra variable declarations spliced into the `Vars` sub-struct,
    /// one declaration per line, in addition to whatever the machine
    /// itself declares.
    pub variable_declarations: Vec<String>,
    /// Emit the `StateIdToString`/`EventIdToString` helpers.
    pub string_helpers: bool,
}

impl RenderConfig {
    #[must_use]
    pub fn new() -> Self {
        RenderConfig {
            algorithm: Algorithm::Table1,
            transpiler: Transpiler::C99,
            variable_declarations: Vec::new(),
            string_helpers: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig::new()
    }
}
