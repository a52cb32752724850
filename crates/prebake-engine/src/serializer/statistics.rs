//! Serializer counters and phase timings.

use serde::Serialize;
use std::ops::AddAssign;
use std::time::{Duration, Instant};

/// Counters collected while emitting code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerializerStatistics {
    /// Ordinary objects emitted
    pub objects: usize,
    /// Arrays emitted
    pub arrays: usize,
    /// Functions emitted
    pub functions: usize,
    /// Named declarations of values
    pub declarations: usize,
    /// Values written inline at their only use
    pub inlined_values: usize,
    /// Scope storage arrays emitted
    pub scopes: usize,
    /// Captured bindings routed through scope storage
    pub referentialized_bindings: usize,
    /// Assignments emitted after a forward reference was resolved
    pub deferred_assignments: usize,
    /// Objects emitted as lazy thunks
    pub lazy_objects: usize,
    /// Additional functions emitted
    pub additional_functions: usize,
}

impl SerializerStatistics {
    /// Log the counters at info level
    pub fn log(&self) {
        tracing::info!(
            objects = self.objects,
            arrays = self.arrays,
            functions = self.functions,
            declarations = self.declarations,
            inlined = self.inlined_values,
            scopes = self.scopes,
            referentialized = self.referentialized_bindings,
            deferred = self.deferred_assignments,
            lazy = self.lazy_objects,
            additional_functions = self.additional_functions,
            "serializer statistics"
        );
    }
}

/// Wall-clock time spent in each phase.
///
/// Additive: one `Serializer` reused for several runs accumulates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingStatistics {
    /// Parsing source units
    pub parse: Duration,
    /// Running global code
    pub execute: Duration,
    /// Module resolution and forced initialization
    pub modules: Duration,
    /// Running and checking additional functions
    pub functions: Duration,
    /// Residual heap visit
    pub visit: Duration,
    /// Scope storage allocation
    pub referentialize: Duration,
    /// Heap graph export
    pub heap_graph: Duration,
    /// Counting pass
    pub count: Duration,
    /// Final emission pass
    pub serialize: Duration,
    /// Type annotation stripping
    pub strip: Duration,
    /// Text emission
    pub print: Duration,
    /// Whole pipeline
    pub total: Duration,
}

impl TimingStatistics {
    /// Run `f`, adding its wall-clock time to the field `select` picks
    pub fn measure<R>(
        &mut self,
        select: impl FnOnce(&mut Self) -> &mut Duration,
        f: impl FnOnce() -> R,
    ) -> R {
        let start = Instant::now();
        let result = f();
        *select(self) += start.elapsed();
        result
    }

    /// Log the timings at info level
    pub fn log(&self) {
        tracing::info!(
            parse = ?self.parse,
            execute = ?self.execute,
            modules = ?self.modules,
            functions = ?self.functions,
            visit = ?self.visit,
            count = ?self.count,
            serialize = ?self.serialize,
            print = ?self.print,
            total = ?self.total,
            "serializer timings"
        );
    }
}

impl AddAssign<&TimingStatistics> for TimingStatistics {
    fn add_assign(&mut self, other: &TimingStatistics) {
        self.parse += other.parse;
        self.execute += other.execute;
        self.modules += other.modules;
        self.functions += other.functions;
        self.visit += other.visit;
        self.referentialize += other.referentialize;
        self.heap_graph += other.heap_graph;
        self.count += other.count;
        self.serialize += other.serialize;
        self.strip += other.strip;
        self.print += other.print;
        self.total += other.total;
    }
}

/// Statistics about additional functions (optimized component roots).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReactStatistics {
    /// Additional functions emitted as independent units
    pub optimized_trees: usize,
    /// Functions created inside additional functions
    pub nested_closures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timings_are_additive() {
        let mut total = TimingStatistics::default();
        let run = TimingStatistics {
            parse: Duration::from_millis(2),
            total: Duration::from_millis(5),
            ..Default::default()
        };
        total += &run;
        total += &run;
        assert_eq!(total.parse, Duration::from_millis(4));
        assert_eq!(total.total, Duration::from_millis(10));
    }

    #[test]
    fn test_measure_accumulates_into_field() {
        let mut timing = TimingStatistics::default();
        let value = timing.measure(|t| &mut t.visit, || 42);
        assert_eq!(value, 42);
        assert_eq!(timing.parse, Duration::ZERO);
    }
}
