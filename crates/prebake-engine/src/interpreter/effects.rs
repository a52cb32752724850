//! Effect recording.
//!
//! The `Generator` keeps a stack of named recording sessions. Writes,
//! reads and creations performed by the interpreter are appended to the
//! innermost session. A finished session is an `EffectsRecord`, which can
//! be undone to restore the state it started from.

use crate::interpreter::environment::EnvId;
use crate::interpreter::heap::ObjectId;
use crate::interpreter::value::Value;
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use std::fmt;

/// A mutable storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A binding in an environment record
    Binding {
        /// Owning record
        env: EnvId,
        /// Binding name
        name: String,
    },
    /// A named property of an object
    Property {
        /// Owning object
        object: ObjectId,
        /// Property key
        key: String,
    },
    /// An element of an array
    Element {
        /// Owning array
        object: ObjectId,
        /// Element index
        index: usize,
    },
}

impl Location {
    /// The object this location belongs to, if any
    pub fn object(&self) -> Option<ObjectId> {
        match self {
            Location::Binding { .. } => None,
            Location::Property { object, .. } | Location::Element { object, .. } => Some(*object),
        }
    }

    /// The environment this location belongs to, if any
    pub fn env(&self) -> Option<EnvId> {
        match self {
            Location::Binding { env, .. } => Some(*env),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Binding { env, name } => write!(f, "binding `{}` in {}", name, env),
            Location::Property { object, key } => write!(f, "property `{}` of {}", key, object),
            Location::Element { object, index } => write!(f, "element {} of {}", index, object),
        }
    }
}

/// One recorded write.
#[derive(Debug, Clone)]
pub struct WriteEntry {
    /// Where the write happened
    pub location: Location,
    /// Previous value; `None` when the write created the location
    pub old: Option<Value>,
    /// New value
    pub new: Value,
}

/// The effects of running one unit of code.
#[derive(Debug, Clone, Default)]
pub struct EffectsRecord {
    /// Session name ("main", a module id, an additional function)
    pub name: String,
    /// Writes in execution order
    pub writes: Vec<WriteEntry>,
    /// Locations read, in first-read order
    pub reads: IndexSet<Location>,
    /// Objects allocated during the session
    pub created_objects: FxHashSet<ObjectId>,
    /// Environments created during the session
    pub created_envs: FxHashSet<EnvId>,
}

impl EffectsRecord {
    /// Create an empty record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True when the location's owner was created in this session
    pub fn owns(&self, location: &Location) -> bool {
        match location {
            Location::Binding { env, .. } => self.created_envs.contains(env),
            Location::Property { object, .. } | Location::Element { object, .. } => {
                self.created_objects.contains(object)
            }
        }
    }

    /// Written locations in first-write order, without duplicates
    pub fn written_locations(&self) -> IndexSet<Location> {
        self.writes.iter().map(|w| w.location.clone()).collect()
    }
}

/// Stack of recording sessions.
#[derive(Debug, Default)]
pub struct Generator {
    sessions: Vec<EffectsRecord>,
}

impl Generator {
    /// Create an empty generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new innermost session
    pub fn begin(&mut self, name: impl Into<String>) {
        self.sessions.push(EffectsRecord::new(name));
    }

    /// Finish the innermost session
    pub fn end(&mut self) -> Option<EffectsRecord> {
        self.sessions.pop()
    }

    /// The outermost session, if its name matches
    pub fn root(&self, name: &str) -> Option<&EffectsRecord> {
        self.sessions.first().filter(|record| record.name == name)
    }

    /// Number of open sessions
    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    /// Record a write in the innermost session
    pub fn record_write(&mut self, location: Location, old: Option<Value>, new: Value) {
        if let Some(session) = self.sessions.last_mut() {
            session.writes.push(WriteEntry { location, old, new });
        }
    }

    /// Record a read in the innermost session
    pub fn record_read(&mut self, location: Location) {
        if let Some(session) = self.sessions.last_mut() {
            session.reads.insert(location);
        }
    }

    /// Record an allocation
    pub fn record_object(&mut self, id: ObjectId) {
        if let Some(session) = self.sessions.last_mut() {
            session.created_objects.insert(id);
        }
    }

    /// Record an environment creation
    pub fn record_env(&mut self, id: EnvId) {
        if let Some(session) = self.sessions.last_mut() {
            session.created_envs.insert(id);
        }
    }
}
