//! Prebake Engine
//!
//! An ahead-of-time partial evaluator: runs a program's initialization
//! code and emits a program that rebuilds the resulting heap directly.
//!
//! - **Parser**: lexer, parser, capture analysis and printer (`parser` module)
//! - **Interpreter**: heap, environments, effect log and evaluation (`interpreter` module)
//! - **Serializer**: residual heap visit, naming and emission (`serializer` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use prebake_engine::{Serializer, SerializerOptions, SourceUnit};
//!
//! let mut serializer = Serializer::new(SerializerOptions::default());
//! let units = [SourceUnit::new("main.js", "var x = {}; x.self = x;")];
//! if let Some(result) = serializer.init(&units)? {
//!     println!("{}", result.code);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Parser module: lexer, parser, capture analysis and printer
pub mod parser;

/// Interpreter module: realm, heap, environments and effect recording
pub mod interpreter;

/// Serializer module: residual heap capture and code emission
pub mod serializer;

// ============================================================================
// Re-exports
// ============================================================================

pub use interpreter::modules::PRELUDE as MODULE_PRELUDE;
pub use interpreter::{ExecutionLimits, Realm, Thrown};
pub use serializer::{
    Diagnostic, DiagnosticLog, ErrorCode, HeapGraphFormat, ModuleReport, ReactStatistics,
    SerializedResult, Serializer, SerializerError, SerializerOptions, SerializerStatistics,
    Severity, SourceUnit, TimingStatistics,
};
