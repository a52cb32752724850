//! Line-level source maps for emitted code.
//!
//! The printer records one mapping per emitted function, pointing at the
//! function's position in its original source unit. The map is written as
//! plain JSON rather than VLQ-encoded segments.

use serde::{Deserialize, Serialize};

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

/// One generated-to-original correspondence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    /// Position in the generated code
    pub generated: Position,
    /// Index into `SourceMap::sources`
    pub source: usize,
    /// Position in the original unit
    pub original: Position,
    /// Function name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Source map for one emitted program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    /// Format version
    pub version: u32,
    /// Original file paths, indexed by source unit
    pub sources: Vec<String>,
    /// Mappings ordered by generated position
    pub mappings: Vec<Mapping>,
}

impl SourceMap {
    /// Create an empty map over the given sources
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            version: 1,
            sources,
            mappings: Vec::new(),
        }
    }

    /// Add a mapping
    pub fn add(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
