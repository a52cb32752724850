//! Module registry convention.
//!
//! Programs that bundle modules register them in a global `__modules`
//! object through `__d(factory, id)`; each entry is
//! `{ factory, exports, initialized }` and `require(id)` runs a factory on
//! first use. `PRELUDE` defines these helpers in the source language.

use crate::interpreter::heap::ObjectKind;
use crate::interpreter::value::Value;
use crate::interpreter::{Realm, Thrown};
use thiserror::Error;

/// Global holding the module registry.
pub const REGISTRY_GLOBAL: &str = "__modules";

/// Global holding the `require` function.
pub const REQUIRE_GLOBAL: &str = "require";

/// Source-language definitions of `__modules`, `__d` and `require`.
pub const PRELUDE: &str = r#"var __modules = {};
function __d(factory, id) {
  __modules[id] = { factory: factory, exports: {}, initialized: false };
}
function require(id) {
  var entry = __modules[id];
  if (!entry) {
    throw "Error: unknown module " + id;
  }
  if (!entry.initialized) {
    entry.initialized = true;
    var module = { exports: entry.exports };
    entry.factory(module, entry.exports, require);
    entry.exports = module.exports;
  }
  return entry.exports;
}
"#;

/// Registry problems.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    /// `__modules` exists but is not an object
    #[error("`__modules` is not an object")]
    NotAnObject,

    /// A registry entry lacks the expected shape
    #[error("module `{id}` has a malformed registry entry")]
    MalformedEntry {
        /// Module id
        id: String,
    },

    /// The registry exists but `require` does not
    #[error("`require` is not a function")]
    MissingRequire,
}

/// Snapshot of which registered modules have run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleStatus {
    /// Ids of initialized modules, in registration order
    pub initialized: Vec<String>,
    /// Ids of modules whose factory has not run
    pub uninitialized: Vec<String>,
}

impl Realm {
    /// True when the program set up a module registry
    pub fn has_module_registry(&self) -> bool {
        self.global_binding(REGISTRY_GLOBAL).is_some()
    }

    /// Inspect the registry without recording reads.
    pub fn module_status(&self) -> Result<ModuleStatus, RegistryError> {
        let mut status = ModuleStatus::default();
        let Some(registry) = self.global_binding(REGISTRY_GLOBAL) else {
            return Ok(status);
        };
        let registry = match registry.as_object().and_then(|id| self.heap.get(id)) {
            Some(object) if matches!(object.kind, ObjectKind::Ordinary) => object,
            _ => return Err(RegistryError::NotAnObject),
        };

        for (id, entry) in &registry.properties {
            let initialized = entry
                .as_object()
                .and_then(|entry| self.peek_property(entry, "initialized"));
            match initialized {
                Some(Value::Bool(true)) => status.initialized.push(id.clone()),
                Some(Value::Bool(false)) => status.uninitialized.push(id.clone()),
                _ => return Err(RegistryError::MalformedEntry { id: id.clone() }),
            }
        }
        Ok(status)
    }

    /// Run `require(id)` inside its own recording session.
    ///
    /// On a throw the session's effects are undone, leaving the module
    /// uninitialized.
    pub fn require_module(&mut self, id: &str) -> Result<Result<Value, Thrown>, RegistryError> {
        let require = match self.global_binding(REQUIRE_GLOBAL) {
            Some(value) if value.type_of(&self.heap) == "function" => value.clone(),
            _ => return Err(RegistryError::MissingRequire),
        };

        self.generator.begin(format!("module {}", id));
        let result = self.call(&require, vec![Value::string(id)]);
        let record = self.generator.end().unwrap_or_default();
        if result.is_err() {
            self.undo(&record, false);
        }
        Ok(result)
    }
}
