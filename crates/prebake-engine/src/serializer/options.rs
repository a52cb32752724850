//! Serializer configuration.
//!
//! Every optional phase of the pipeline is toggled by one field here and
//! consulted at a fixed checkpoint. The struct deserializes from the
//! `[serializer]` table of a `prebake.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialized form of the heap graph artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeapGraphFormat {
    /// Graphviz `digraph`
    DotLanguage,
    /// vis.js `{ nodes, edges }` JSON
    VisJs,
}

impl FromStr for HeapGraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dot" | "dot-language" | "DotLanguage" => Ok(HeapGraphFormat::DotLanguage),
            "vis-js" | "visjs" | "VISJS" | "VisJs" => Ok(HeapGraphFormat::VisJs),
            other => Err(format!("unknown heap graph format `{}`", other)),
        }
    }
}

impl fmt::Display for HeapGraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapGraphFormat::DotLanguage => write!(f, "dot-language"),
            HeapGraphFormat::VisJs => write!(f, "vis-js"),
        }
    }
}

/// Options controlling one serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SerializerOptions {
    /// Collect per-phase wall-clock timings
    pub profile: bool,
    /// Force initialization of modules global code did not require
    pub initialize_more_modules: bool,
    /// Run the counting pass so single-use values are inlined
    pub inline_expressions: bool,
    /// Log serializer statistics when done
    pub log_statistics: bool,
    /// Export the residual heap graph in this format
    pub heap_graph_format: Option<HeapGraphFormat>,
    /// Name of the global lazy-object runtime; selects the lazy serializer
    pub lazy_objects_runtime: Option<String>,
    /// Dump internal tables at debug level
    pub internal_debug: bool,
    /// Log which modules were initialized
    pub log_modules: bool,
    /// Turn module initialization failures into warnings
    pub delay_unsupported_requires: bool,
    /// Retry failed module initializations while others make progress
    pub accelerate_unsupported_requires: bool,
    /// Trace interpreter calls
    pub trace: bool,
    /// Remove type annotations from the output
    pub strip_type_annotations: bool,
    /// Produce a source map
    pub source_maps: bool,
    /// Evaluation step budget
    pub max_steps: u64,
    /// Call depth limit
    pub max_call_depth: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            profile: false,
            initialize_more_modules: false,
            inline_expressions: false,
            log_statistics: false,
            heap_graph_format: None,
            lazy_objects_runtime: None,
            internal_debug: false,
            log_modules: false,
            delay_unsupported_requires: false,
            accelerate_unsupported_requires: false,
            trace: false,
            strip_type_annotations: false,
            source_maps: false,
            max_steps: 5_000_000,
            max_call_depth: 200,
        }
    }
}

impl SerializerOptions {
    /// Interpreter limits derived from these options
    pub fn execution_limits(&self) -> crate::interpreter::ExecutionLimits {
        crate::interpreter::ExecutionLimits {
            max_steps: self.max_steps,
            max_call_depth: self.max_call_depth,
        }
    }
}
