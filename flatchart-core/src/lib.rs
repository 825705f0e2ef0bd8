//! # flatchart
//! Table-driven C99 code generation for UML-style hierarchical state
//! machines.
//!
//! The generator consumes a fully-resolved statechart graph and emits a
//! single freestanding C99 translation unit: one pre-expanded
//! transition table, `state_parent[]`/`state_depth[]` lookup tables, a
//! linear-search dispatcher and an LCA-based enter/exit protocol.
//! Hierarchy is resolved at generation time, so the emitted dispatcher
//! never walks parent states; the runtime cost is one O(rows) scan per
//! event and zero allocation.
//!
//! ```
//! use flatchart_core::{Hsm, HsmBuilder, RenderConfig, TableCodeGenerator};
//!
//! let mut b = HsmBuilder::new("blinky");
//! let off = b.state(Hsm::ROOT, "Off");
//! let on = b.state(Hsm::ROOT, "On");
//! b.initial(Hsm::ROOT, off, None);
//! b.event("TICK");
//! b.transition(off, &["TICK"], None, None, on);
//! b.transition(on, &["TICK"], None, None, off);
//! let hsm = b.finish().unwrap();
//!
//! let mut generator = TableCodeGenerator::with_defaults(RenderConfig::new());
//! let c_source = generator.bind(&hsm).generate().unwrap();
//! assert!(c_source.contains("Blinky_DispatchEvent"));
//! ```
//!
//! The diagram front-end, name mangling policy and identifier expansion
//! are pluggable: see [`NameMangler`] and [`Expander`].

pub mod codegen;
pub mod collect;
pub mod config;
pub mod error;
pub mod expand;
pub mod hsm;
pub mod index;
pub mod mangle;
pub mod writer;

pub use codegen::TableCodeGenerator;
pub use collect::{TransitionEntry, TransitionSet};
pub use config::{Algorithm, RenderConfig, Transpiler};
pub use error::{GenerateError, MangleError};
pub use expand::{Expander, FieldAccessExpander, VerbatimExpander};
pub use hsm::{Behavior, BehaviorId, HistoryKind, Hsm, HsmBuilder, Vertex, VertexId};
pub use index::{EventId, IndexTables, StateId};
pub use mangle::{C99Mangler, NameMangler};
