//! Source language front end and text emitter.
//!
//! # Example
//!
//! ```ignore
//! use prebake_engine::parser::{parse_source, print_program};
//!
//! let unit = parse_source("var x = {}; x.self = x;", 0)?;
//! println!("{}", print_program(&unit.program));
//! ```

pub mod token;
pub mod lexer;
pub mod ast;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod captures;
pub mod printer;
pub mod source_map;
pub mod strip;

// Re-exports for convenience
pub use token::{Token, Span};
pub use lexer::{Lexer, LexError};
pub use parser::{parse_source, ParseError, ParsedUnit, Parser};
pub use printer::{print_program, Printer};
pub use source_map::SourceMap;
pub use strip::strip_type_annotations;
