//! Colored terminal output.
//!
//! Uses `termcolor` for cross-platform colors and respects `NO_COLOR` and
//! the `--color` flag. Diagnostics are rendered by `codespan-reporting`
//! against the source units.

use prebake_engine::{DiagnosticLog, Serializer, SourceUnit};
use serde::Serialize;
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from the CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled writer for status lines on stderr.
pub struct StyledOutput {
    stderr: StandardStream,
}

impl StyledOutput {
    /// Create a writer with the given color choice
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stderr: StandardStream::stderr(choice),
        }
    }

    fn line(&mut self, label: &str, color: Color, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "{}", label);
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, " {}", text);
    }

    /// `error: text` in red
    pub fn error_line(&mut self, text: &str) {
        self.line("error:", Color::Red, text);
    }

    /// `warning: text` in yellow
    pub fn warning_line(&mut self, text: &str) {
        self.line("warning:", Color::Yellow, text);
    }

    /// `text` after a green label
    pub fn success_line(&mut self, label: &str, text: &str) {
        self.line(label, Color::Green, text);
    }

    /// Render every diagnostic against `units`
    pub fn diagnostics(&mut self, log: &DiagnosticLog, units: &[SourceUnit]) {
        if log.is_empty() {
            return;
        }
        let files = Serializer::files(units);
        if let Err(e) = log.emit(&mut self.stderr, &files) {
            // Fall back to the plain one-line form
            tracing::debug!(error = %e, "diagnostic rendering failed");
            for diagnostic in log.iter() {
                let _ = writeln!(self.stderr, "{}", diagnostic);
            }
        }
    }

    /// `value` as pretty JSON
    pub fn json<T: Serialize>(&mut self, value: &T) -> serde_json::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        let _ = writeln!(self.stderr, "{}", json);
        Ok(())
    }
}
