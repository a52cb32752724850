//! Diagnostic log.
//!
//! Phases push diagnostics here instead of failing; the orchestrator checks
//! the log at fixed checkpoints. Diagnostics render through
//! `codespan-reporting` against the source units they point into.

use crate::parser::token::Span;
use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity as CsSeverity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::WriteColor;
use serde::Serialize;
use std::fmt;

/// Error code for a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    /// Syntax error in a source unit
    pub const PARSE: ErrorCode = ErrorCode("PB1000");
    /// Global code completed abruptly
    pub const ABRUPT_COMPLETION: ErrorCode = ErrorCode("PB1001");
    /// A module factory threw
    pub const MODULE_INIT_FAILED: ErrorCode = ErrorCode("PB1101");
    /// A module factory threw and was left uninitialized
    pub const MODULE_DELAYED: ErrorCode = ErrorCode("PB1102");
    /// The module registry has an unexpected shape
    pub const MALFORMED_REGISTRY: ErrorCode = ErrorCode("PB1103");
    /// Additional functions share mutable state
    pub const INDEPENDENCE_VIOLATION: ErrorCode = ErrorCode("PB1201");
    /// An additional function threw
    pub const ADDITIONAL_FUNCTION_THREW: ErrorCode = ErrorCode("PB1202");
    /// `__optimize` was given something that is not a function
    pub const NOT_A_FUNCTION: ErrorCode = ErrorCode("PB1203");
    /// An additional function is not reachable from any global
    pub const UNREACHABLE_ADDITIONAL_FUNCTION: ErrorCode = ErrorCode("PB1204");

    /// Code text
    pub fn as_str(&self) -> &str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Does not prevent output
    Warning,
    /// Prevents output
    Error,
}

/// A location inside a source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Index of the source unit
    pub unit: usize,
    /// Byte range and line/column
    #[serde(skip)]
    pub span: Span,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl SourceLocation {
    /// Location of `span` in unit `unit`
    pub fn new(unit: usize, span: Span) -> Self {
        Self {
            unit,
            span,
            line: span.line,
            column: span.column,
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Stable code
    pub code: ErrorCode,
    /// Message text
    pub message: String,
    /// Where it applies, if anywhere specific
    pub location: Option<SourceLocation>,
    /// Extra notes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    fn new(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            notes: Vec::new(),
        }
    }

    /// Attach a location
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan diagnostic (file ids are unit indices)
    pub fn to_codespan(&self) -> CsDiagnostic<usize> {
        let severity = match self.severity {
            Severity::Info => CsSeverity::Note,
            Severity::Warning => CsSeverity::Warning,
            Severity::Error => CsSeverity::Error,
        };
        let mut diagnostic = CsDiagnostic::new(severity)
            .with_message(&self.message)
            .with_code(self.code.0)
            .with_notes(self.notes.clone());
        if let Some(location) = self.location {
            diagnostic = diagnostic.with_labels(vec![Label::primary(
                location.unit,
                location.span.start..location.span.end,
            )]);
        }
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}[{}]: {}", severity, self.code, self.message)?;
        if let Some(location) = self.location {
            write!(f, " (unit {} line {}:{})", location.unit, location.line, location.column)?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics for one serialization
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic, mirroring it to the `tracing` log
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => tracing::error!("{}", diagnostic),
            Severity::Warning => tracing::warn!("{}", diagnostic),
            Severity::Info => tracing::info!("{}", diagnostic),
        }
        self.entries.push(diagnostic);
    }

    /// True when any error has been logged
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of errors
    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.severity == Severity::Error).count()
    }

    /// All diagnostics in log order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Diagnostics with a given code
    pub fn with_code(&self, code: ErrorCode) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.code == code)
    }

    /// Number of diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been logged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render every diagnostic against `files` (ids are unit indices).
    pub fn emit(
        &self,
        writer: &mut dyn WriteColor,
        files: &SimpleFiles<String, String>,
    ) -> Result<(), codespan_reporting::files::Error> {
        let config = term::Config::default();
        for diagnostic in &self.entries {
            term::emit(writer, &config, files, &diagnostic.to_codespan())?;
        }
        Ok(())
    }
}
