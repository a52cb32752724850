//! Environment records.
//!
//! Every scope gets a record with a strictly increasing `EnvId`. The arena
//! owns the counter; `next_id()` after global code has run is the cutoff
//! that separates environments created by global code from those created
//! later.

use crate::interpreter::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// Identity of an environment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvId(pub u32);

impl EnvId {
    /// The global environment
    pub const GLOBAL: EnvId = EnvId(0);

    /// True for the global environment
    pub fn is_global(self) -> bool {
        self == Self::GLOBAL
    }
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env{}", self.0)
    }
}

/// One scope: ordered bindings plus a parent link.
#[derive(Debug, Clone)]
pub struct EnvironmentRecord {
    /// Identity (creation order)
    pub id: EnvId,
    /// Enclosing scope, `None` only for the global record
    pub parent: Option<EnvId>,
    /// Bindings in declaration order
    pub bindings: IndexMap<String, Value>,
}

/// All environment records of a realm.
#[derive(Debug)]
pub struct EnvironmentArena {
    records: Vec<EnvironmentRecord>,
}

impl Default for EnvironmentArena {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentArena {
    /// Create an arena holding only the global environment
    pub fn new() -> Self {
        Self {
            records: vec![EnvironmentRecord {
                id: EnvId::GLOBAL,
                parent: None,
                bindings: IndexMap::new(),
            }],
        }
    }

    /// Create a child environment
    pub fn create(&mut self, parent: EnvId) -> EnvId {
        let id = self.next_id();
        self.records.push(EnvironmentRecord {
            id,
            parent: Some(parent),
            bindings: IndexMap::new(),
        });
        id
    }

    /// The id the next environment will receive
    pub fn next_id(&self) -> EnvId {
        EnvId(self.records.len() as u32)
    }

    /// Look up a record
    pub fn get(&self, id: EnvId) -> Option<&EnvironmentRecord> {
        self.records.get(id.0 as usize)
    }

    /// Look up a record mutably
    pub fn get_mut(&mut self, id: EnvId) -> Option<&mut EnvironmentRecord> {
        self.records.get_mut(id.0 as usize)
    }

    /// The global record
    pub fn global(&self) -> &EnvironmentRecord {
        &self.records[0]
    }

    /// Walk the scope chain from `start` to the record declaring `name`.
    pub fn resolve(&self, start: EnvId, name: &str) -> Option<EnvId> {
        let mut current = Some(start);
        while let Some(id) = current {
            let record = self.get(id)?;
            if record.bindings.contains_key(name) {
                return Some(id);
            }
            current = record.parent;
        }
        None
    }

    /// Read a binding directly from a record
    pub fn binding(&self, env: EnvId, name: &str) -> Option<&Value> {
        self.get(env).and_then(|record| record.bindings.get(name))
    }
}

/// The environment counter value recorded right after global code ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentCutoff(pub EnvId);

impl EnvironmentCutoff {
    /// True when `env` was created while running global code
    pub fn is_global_code(&self, env: EnvId) -> bool {
        env < self.0
    }
}
