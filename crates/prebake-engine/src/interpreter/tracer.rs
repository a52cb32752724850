//! Call tracing hooks.

use crate::interpreter::value::Value;

/// Observer of function calls made by the interpreter.
pub trait Tracer {
    /// Called before a function body runs
    fn before_call(&mut self, function: &str, args: &[Value]);

    /// Called after a function returns or throws
    fn after_call(&mut self, function: &str, result: Result<&Value, &Value>);
}

/// Tracer that emits `tracing` events, indented by call depth.
#[derive(Debug, Default)]
pub struct LoggingTracer {
    depth: usize,
}

impl LoggingTracer {
    /// Create a tracer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tracer for LoggingTracer {
    fn before_call(&mut self, function: &str, args: &[Value]) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        tracing::trace!(
            target: "prebake::trace",
            "{:indent$}call {}({})",
            "",
            function,
            args.join(", "),
            indent = self.depth * 2
        );
        self.depth += 1;
    }

    fn after_call(&mut self, function: &str, result: Result<&Value, &Value>) {
        self.depth = self.depth.saturating_sub(1);
        match result {
            Ok(value) => tracing::trace!(
                target: "prebake::trace",
                "{:indent$}return {} -> {}",
                "",
                function,
                value,
                indent = self.depth * 2
            ),
            Err(thrown) => tracing::trace!(
                target: "prebake::trace",
                "{:indent$}throw {} -> {}",
                "",
                function,
                thrown,
                indent = self.depth * 2
            ),
        }
    }
}
