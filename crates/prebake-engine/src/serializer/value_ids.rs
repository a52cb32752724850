//! Value identifier table.
//!
//! The first serialization pass is a dry run that only counts how often
//! each value is referenced; the second pass asks the table whether a
//! value is written inline at its single use or bound to a name.

use crate::interpreter::heap::ObjectId;
use crate::serializer::error::{SerializerError, SerializerResult};
use rustc_hash::FxHashMap;

/// Phase of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// Dry run: references are counted
    Counting,
    /// Counts are frozen and decisions can be queried
    Finalized,
}

/// How a value appears in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingDecision {
    /// Constructed in place at its only use
    Inline,
    /// Declared once and referred to by name
    Bind,
}

/// Reference counts and naming decisions.
#[derive(Debug, Clone)]
pub struct ValueIdentifiers {
    mode: TableMode,
    counts: FxHashMap<ObjectId, usize>,
    conservative: bool,
}

impl Default for ValueIdentifiers {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueIdentifiers {
    /// Table in counting mode
    pub fn new() -> Self {
        Self {
            mode: TableMode::Counting,
            counts: FxHashMap::default(),
            conservative: false,
        }
    }

    /// Current mode
    pub fn mode(&self) -> TableMode {
        self.mode
    }

    /// Start the counting pass, discarding previous counts
    pub fn init_pass1(&mut self) {
        self.mode = TableMode::Counting;
        self.counts.clear();
        self.conservative = false;
    }

    /// Freeze the counts.
    pub fn init_pass2(&mut self) -> SerializerResult<()> {
        if self.mode != TableMode::Counting {
            return Err(SerializerError::internal(
                "value identifiers finalized without a counting pass",
            ));
        }
        self.mode = TableMode::Finalized;
        Ok(())
    }

    /// Freeze without counting: every value is bound to a name
    pub fn finalize_conservative(&mut self) {
        self.mode = TableMode::Finalized;
        self.conservative = true;
    }

    /// Count one reference. No-op once finalized
    pub fn reference(&mut self, id: ObjectId) {
        if self.mode == TableMode::Counting {
            *self.counts.entry(id).or_insert(0) += 1;
        }
    }

    /// References counted for `id`
    pub fn count(&self, id: ObjectId) -> usize {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Naming decision for `id`; only valid once finalized.
    pub fn naming_decision(&self, id: ObjectId) -> SerializerResult<NamingDecision> {
        if self.mode != TableMode::Finalized {
            return Err(SerializerError::internal(format!(
                "naming decision for {} requested while counting",
                id
            )));
        }
        if self.conservative {
            return Ok(NamingDecision::Bind);
        }
        Ok(match self.count(id) {
            1 => NamingDecision::Inline,
            // Unseen values are never inlined
            _ => NamingDecision::Bind,
        })
    }

    /// Dump the counts at debug level
    pub fn log(&self) {
        let mut counts: Vec<_> = self.counts.iter().collect();
        counts.sort();
        for (id, count) in counts {
            tracing::debug!(value = %id, count, "reference count");
        }
    }
}
