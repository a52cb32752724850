//! Concrete interpreter for the source language.
//!
//! The `Realm` owns the heap, the environment arena and the effect
//! generator. Evaluation lives in `eval`; this module holds the state and
//! the primitive read/write operations that feed the effect log.

pub mod effects;
pub mod environment;
pub mod eval;
pub mod heap;
pub mod modules;
pub mod tracer;
pub mod value;

use crate::interpreter::effects::{EffectsRecord, Generator, Location};
use crate::interpreter::environment::{EnvId, EnvironmentArena};
use crate::interpreter::heap::{Heap, ObjectId, ObjectKind};
use crate::interpreter::tracer::Tracer;
use crate::interpreter::value::{array_index, Value};
use std::fmt;
use thiserror::Error;

pub use environment::EnvironmentCutoff;

/// Name of the recording session that runs global code.
pub const MAIN_RECORDING: &str = "main";

/// Most holes a single array element write may open past the current length
pub const MAX_ARRAY_GAP: usize = 1 << 16;

/// Limits that turn runaway programs into thrown completions.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    /// Maximum number of evaluation steps per realm
    pub max_steps: u64,
    /// Maximum function call depth
    pub max_call_depth: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_steps: 5_000_000,
            max_call_depth: 200,
        }
    }
}

/// A value thrown out of the interpreter.
#[derive(Debug, Clone, Error)]
#[error("Uncaught {message}")]
pub struct Thrown {
    /// The thrown value
    pub value: Value,
    /// The value rendered as text when it was thrown
    pub message: String,
}

impl Thrown {
    /// Wrap a thrown value
    pub fn new(value: Value, heap: &Heap) -> Self {
        let message = value.to_display_string(heap);
        Self { value, message }
    }

    /// A built-in error such as `TypeError: x is not a function`
    pub fn error(kind: &str, message: impl fmt::Display) -> Self {
        let message = format!("{}: {}", kind, message);
        Self {
            value: Value::string(&message),
            message,
        }
    }
}

/// An execution frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A running function
    Function {
        /// Function name for diagnostics
        name: String,
    },
    /// Synthetic frame pushed while reporting a diagnostic
    Diagnostic {
        /// What is being reported
        reason: String,
    },
}

/// Interpreter state.
pub struct Realm {
    /// Object heap
    pub heap: Heap,
    /// Environment records
    pub envs: EnvironmentArena,
    /// Effect log
    pub generator: Generator,
    frames: Vec<Frame>,
    tracer: Option<Box<dyn Tracer>>,
    limits: ExecutionLimits,
    steps: u64,
    additional_functions: Vec<Value>,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new(ExecutionLimits::default())
    }
}

impl Realm {
    /// Create an empty realm
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            heap: Heap::new(),
            envs: EnvironmentArena::new(),
            generator: Generator::new(),
            frames: Vec::new(),
            tracer: None,
            limits,
            steps: 0,
            additional_functions: Vec::new(),
        }
    }

    /// Attach a call tracer
    pub fn set_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = Some(tracer);
    }

    /// Current frame stack, innermost last
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Run `f` with `frame` pushed; the frame is popped however `f` returns.
    pub fn with_frame<R>(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> R) -> R {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }

    /// Functions registered through `__optimize`, in registration order
    pub fn additional_functions(&self) -> &[Value] {
        &self.additional_functions
    }

    pub(crate) fn register_additional_function(&mut self, function: Value) {
        if !self.additional_functions.contains(&function) {
            self.additional_functions.push(function);
        }
    }

    /// Value of a global binding, without recording a read
    pub fn global_binding(&self, name: &str) -> Option<&Value> {
        self.envs.binding(EnvId::GLOBAL, name)
    }

    /// Property of an object, without recording a read
    pub fn peek_property(&self, object: ObjectId, key: &str) -> Option<&Value> {
        self.heap.get(object).and_then(|o| o.properties.get(key))
    }

    pub(crate) fn tick(&mut self) -> Result<(), Thrown> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(Thrown::error("RangeError", "execution step budget exhausted"));
        }
        Ok(())
    }

    pub(crate) fn call_depth(&self) -> usize {
        self.frames
            .iter()
            .filter(|frame| matches!(frame, Frame::Function { .. }))
            .count()
    }

    pub(crate) fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    pub(crate) fn tracer_mut(&mut self) -> Option<&mut (dyn Tracer + 'static)> {
        self.tracer.as_deref_mut()
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate an object and record its creation
    pub fn allocate(&mut self, kind: ObjectKind) -> ObjectId {
        let id = self.heap.allocate(kind);
        self.generator.record_object(id);
        id
    }

    /// Create an environment and record its creation
    pub fn create_env(&mut self, parent: EnvId) -> EnvId {
        let id = self.envs.create(parent);
        self.generator.record_env(id);
        id
    }

    // ========================================================================
    // Recorded reads and writes
    // ========================================================================

    /// Declare (or overwrite) a binding directly in `env`
    pub fn declare_binding(&mut self, env: EnvId, name: &str, value: Value) {
        let Some(record) = self.envs.get_mut(env) else {
            return;
        };
        let old = record.bindings.insert(name.to_string(), value.clone());
        self.generator.record_write(
            Location::Binding { env, name: name.to_string() },
            old,
            value,
        );
    }

    /// Read a binding from the record that declares it
    pub fn read_binding(&mut self, env: EnvId, name: &str) -> Value {
        self.generator.record_read(Location::Binding { env, name: name.to_string() });
        self.envs.binding(env, name).cloned().unwrap_or(Value::Undefined)
    }

    /// Read an own property, recording the read even when it is absent
    pub fn read_property(&mut self, object: ObjectId, key: &str) -> Value {
        let Some(obj) = self.heap.get(object) else {
            return Value::Undefined;
        };
        if let (ObjectKind::Array(elements), Some(index)) =
            (&obj.kind, array_index(key))
        {
            let value = elements.get(index).cloned().unwrap_or(Value::Undefined);
            self.generator.record_read(Location::Element { object, index });
            return value;
        }
        let value = obj.properties.get(key).cloned().unwrap_or(Value::Undefined);
        self.generator.record_read(Location::Property { object, key: key.to_string() });
        value
    }

    /// Write a property or array element, recording the previous value.
    ///
    /// Arrays are dense, so an element write more than `MAX_ARRAY_GAP`
    /// past the end throws a `RangeError` instead of allocating the holes.
    pub fn write_property(&mut self, object: ObjectId, key: &str, value: Value) -> Result<(), Thrown> {
        let Some(obj) = self.heap.get_mut(object) else {
            return Ok(());
        };
        if let (ObjectKind::Array(elements), Some(index)) =
            (&mut obj.kind, array_index(key))
        {
            if index.saturating_sub(elements.len()) > MAX_ARRAY_GAP {
                return Err(Thrown::error(
                    "RangeError",
                    format!("array index {} is too far past length {}", index, elements.len()),
                ));
            }
            // Holes are written one by one so undo can truncate them again
            let mut holes = Vec::new();
            while elements.len() < index {
                holes.push(elements.len());
                elements.push(Value::Undefined);
            }
            let old = if index < elements.len() {
                Some(std::mem::replace(&mut elements[index], value.clone()))
            } else {
                elements.push(value.clone());
                None
            };
            for hole in holes {
                self.generator.record_write(
                    Location::Element { object, index: hole },
                    None,
                    Value::Undefined,
                );
            }
            self.generator.record_write(Location::Element { object, index }, old, value);
            return Ok(());
        }
        let old = obj.properties.insert(key.to_string(), value.clone());
        self.generator.record_write(
            Location::Property { object, key: key.to_string() },
            old,
            value,
        );
        Ok(())
    }

    /// Revert the writes of `record`, newest first.
    ///
    /// With `keep_owned`, writes to objects and environments the record
    /// itself created are left in place.
    pub fn undo(&mut self, record: &EffectsRecord, keep_owned: bool) {
        for write in record.writes.iter().rev() {
            if keep_owned && record.owns(&write.location) {
                continue;
            }
            match &write.location {
                Location::Binding { env, name } => {
                    if let Some(env) = self.envs.get_mut(*env) {
                        match &write.old {
                            Some(old) => {
                                env.bindings.insert(name.clone(), old.clone());
                            }
                            None => {
                                env.bindings.shift_remove(name);
                            }
                        }
                    }
                }
                Location::Property { object, key } => {
                    if let Some(obj) = self.heap.get_mut(*object) {
                        match &write.old {
                            Some(old) => {
                                obj.properties.insert(key.clone(), old.clone());
                            }
                            None => {
                                obj.properties.shift_remove(key);
                            }
                        }
                    }
                }
                Location::Element { object, index } => {
                    if let Some(ObjectKind::Array(elements)) =
                        self.heap.get_mut(*object).map(|o| &mut o.kind)
                    {
                        match &write.old {
                            Some(old) => {
                                if let Some(slot) = elements.get_mut(*index) {
                                    *slot = old.clone();
                                }
                            }
                            None => elements.truncate(*index),
                        }
                    }
                }
            }
        }
    }

    /// Current value stored at `location`, without recording a read
    pub fn location_value(&self, location: &Location) -> Value {
        match location {
            Location::Binding { env, name } => {
                self.envs.binding(*env, name).cloned().unwrap_or(Value::Undefined)
            }
            Location::Property { object, key } => {
                self.peek_property(*object, key).cloned().unwrap_or(Value::Undefined)
            }
            Location::Element { object, index } => self
                .heap
                .get(*object)
                .and_then(|o| o.elements())
                .and_then(|elements| elements.get(*index))
                .cloned()
                .unwrap_or(Value::Undefined),
        }
    }
}
