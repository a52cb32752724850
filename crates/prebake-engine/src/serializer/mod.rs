//! Residual heap serializer.
//!
//! Everything after the interpreter: module rounds, additional function
//! extraction, the residual heap visit, value naming, scope storage and
//! code emission, driven by [`Serializer`].

pub mod diagnostics;
pub mod error;
pub mod functions;
pub mod heap_graph;
pub mod lazy;
pub mod modules;
pub mod naming;
pub mod options;
pub mod pipeline;
pub mod referentializer;
pub mod residual;
pub mod residual_serializer;
pub mod statistics;
pub mod value_ids;
pub mod visitor;

pub use diagnostics::{Diagnostic, DiagnosticLog, ErrorCode, Severity, SourceLocation};
pub use error::{SerializerError, SerializerResult};
pub use functions::AdditionalFunctionEffects;
pub use heap_graph::HeapGraph;
pub use lazy::LazySerializer;
pub use modules::ModuleReport;
pub use options::{HeapGraphFormat, SerializerOptions};
pub use pipeline::{SerializedResult, Serializer, SourceUnit};
pub use residual::ResidualSet;
pub use residual_serializer::{EagerSerializer, ResidualSerializer};
pub use statistics::{ReactStatistics, SerializerStatistics, TimingStatistics};
pub use value_ids::{NamingDecision, TableMode, ValueIdentifiers};
