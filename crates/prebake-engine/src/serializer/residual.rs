//! The residual set: everything the visitor found reachable, plus the
//! edges that made it reachable.

use crate::interpreter::effects::Location;
use crate::interpreter::environment::EnvId;
use crate::interpreter::heap::ObjectId;
use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// A binding in a non-global environment record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey {
    /// Record holding the binding
    pub env: EnvId,
    /// Binding name
    pub name: String,
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.env, self.name)
    }
}

/// Which body a value or scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueScope {
    /// Created by global code
    #[default]
    Global,
    /// Created while running this additional function
    Additional(ObjectId),
}

/// How a value was reached.
#[derive(Debug, Clone, PartialEq)]
pub enum Referrer {
    /// A global binding
    Global(String),
    /// A named property of an object
    Property {
        /// Holder
        object: ObjectId,
        /// Key
        key: String,
    },
    /// An element of an array
    Element {
        /// Holder
        object: ObjectId,
        /// Index
        index: usize,
    },
    /// A captured binding
    Binding(BindingKey),
    /// A modification performed by an additional function
    Effect {
        /// The additional function
        function: ObjectId,
        /// The modified location
        location: Location,
    },
    /// The return value of an additional function
    Return(ObjectId),
}

impl fmt::Display for Referrer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Referrer::Global(name) => write!(f, "global {}", name),
            Referrer::Property { object, key } => write!(f, "{}.{}", object, key),
            Referrer::Element { object, index } => write!(f, "{}[{}]", object, index),
            Referrer::Binding(key) => write!(f, "binding {}", key),
            Referrer::Effect { function, location } => {
                write!(f, "effect of {} on {}", function, location)
            }
            Referrer::Return(function) => write!(f, "return of {}", function),
        }
    }
}

/// Per-value information.
#[derive(Debug, Clone, Default)]
pub struct ResidualValueInfo {
    /// Incoming edges, in discovery order
    pub referrers: Vec<Referrer>,
    /// Functions that capture a binding holding this value
    pub capturing_functions: IndexSet<ObjectId>,
    /// Captured bindings holding this value
    pub reading_bindings: IndexSet<BindingKey>,
    /// Owning body
    pub scope: ValueScope,
}

/// What a free name of a function refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    /// A global binding, or a name no environment declares
    Global,
    /// A binding in a non-global environment
    Binding(BindingKey),
}

/// One resolved free name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCapture {
    /// Name as written in the function body
    pub name: String,
    /// Where it resolves
    pub target: CaptureTarget,
}

/// Captures of one function value, in first-reference order.
#[derive(Debug, Clone, Default)]
pub struct ResidualFunction {
    /// Resolved free names
    pub captures: Vec<ResolvedCapture>,
}

impl ResidualFunction {
    /// Captured non-global bindings
    pub fn bindings(&self) -> impl Iterator<Item = &BindingKey> {
        self.captures.iter().filter_map(|capture| match &capture.target {
            CaptureTarget::Binding(key) => Some(key),
            CaptureTarget::Global => None,
        })
    }
}

/// A captured environment record.
#[derive(Debug, Clone)]
pub struct ResidualScope {
    /// The record
    pub env: EnvId,
    /// Captured binding names, in first-capture order
    pub bindings: IndexSet<String>,
    /// Functions capturing from this record
    pub capturing_functions: IndexSet<ObjectId>,
    /// Owning body
    pub scope: ValueScope,
}

/// The visitor's output.
#[derive(Debug, Clone, Default)]
pub struct ResidualSet {
    /// Reachable object values, in visit order
    pub values: IndexMap<ObjectId, ResidualValueInfo>,
    /// Captures of every reachable ordinary function
    pub functions: IndexMap<ObjectId, ResidualFunction>,
    /// Captured non-global environments, in first-capture order
    pub scopes: IndexMap<EnvId, ResidualScope>,
    /// Global bindings, in insertion order
    pub global_roots: Vec<String>,
    /// Additional functions reachable from global bindings
    pub additional_functions: Vec<ObjectId>,
    /// Additional functions no global binding reaches
    pub unreachable_functions: Vec<ObjectId>,
}

impl ResidualSet {
    /// Owning body of a value; values never visited belong to global code
    pub fn scope_of(&self, id: ObjectId) -> ValueScope {
        self.values.get(&id).map_or(ValueScope::Global, |info| info.scope)
    }

    /// True when `id` is reachable
    pub fn contains(&self, id: ObjectId) -> bool {
        self.values.contains_key(&id)
    }

    /// Dump the set at debug level
    pub fn log(&self) {
        tracing::debug!(
            values = self.values.len(),
            functions = self.functions.len(),
            scopes = self.scopes.len(),
            additional = self.additional_functions.len(),
            "residual set"
        );
        for (id, info) in &self.values {
            let referrers: Vec<String> = info.referrers.iter().map(|r| r.to_string()).collect();
            tracing::debug!(value = %id, scope = ?info.scope, ?referrers, "residual value");
        }
        for (env, scope) in &self.scopes {
            tracing::debug!(env = %env, bindings = ?scope.bindings, scope = ?scope.scope, "residual scope");
        }
    }
}
