//! Object heap.
//!
//! Objects live in an arena indexed by `ObjectId`. Ids are handed out in
//! allocation order and never reused, so comparing ids compares creation
//! order.

use crate::interpreter::environment::EnvId;
use crate::interpreter::value::Value;
use crate::parser::ast::FunctionNode;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Identity of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A function value: syntax plus the environment it closes over.
#[derive(Debug, Clone)]
pub struct Closure {
    /// Function syntax, shared by every closure of the same literal
    pub node: Rc<FunctionNode>,
    /// Defining environment
    pub env: EnvId,
}

/// What kind of object this is.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array with dense elements
    Array(Vec<Value>),
    /// Closure
    Function(Closure),
}

impl ObjectKind {
    /// Short name used in logs and heap graphs
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Ordinary => "object",
            ObjectKind::Array(_) => "array",
            ObjectKind::Function(_) => "function",
        }
    }
}

/// A heap object.
#[derive(Debug, Clone)]
pub struct HeapObject {
    /// Identity
    pub id: ObjectId,
    /// Kind-specific payload
    pub kind: ObjectKind,
    /// Own properties in insertion order
    pub properties: IndexMap<String, Value>,
}

impl HeapObject {
    /// The closure, for function objects
    pub fn as_closure(&self) -> Option<&Closure> {
        match &self.kind {
            ObjectKind::Function(closure) => Some(closure),
            _ => None,
        }
    }

    /// The elements, for arrays
    pub fn elements(&self) -> Option<&[Value]> {
        match &self.kind {
            ObjectKind::Array(elements) => Some(elements),
            _ => None,
        }
    }
}

/// Arena of heap objects.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new object
    pub fn allocate(&mut self, kind: ObjectKind) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(HeapObject {
            id,
            kind,
            properties: IndexMap::new(),
        });
        id
    }

    /// Look up an object
    pub fn get(&self, id: ObjectId) -> Option<&HeapObject> {
        self.objects.get(id.0 as usize)
    }

    /// Look up an object mutably
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapObject> {
        self.objects.get_mut(id.0 as usize)
    }

    /// The id the next allocation will receive
    pub fn next_id(&self) -> ObjectId {
        ObjectId(self.objects.len() as u32)
    }

    /// Number of allocated objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
