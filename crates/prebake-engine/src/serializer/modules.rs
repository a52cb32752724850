//! Module resolution rounds.
//!
//! Runs after global code and before the residual heap is visited, so any
//! module forced here is serialized in its initialized state.

use crate::interpreter::modules::RegistryError;
use crate::interpreter::Realm;
use crate::serializer::diagnostics::{Diagnostic, DiagnosticLog, ErrorCode};
use crate::serializer::options::SerializerOptions;
use serde::Serialize;

/// Outcome of the module rounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleReport {
    /// Modules initialized by global code
    pub initialized: Vec<String>,
    /// Modules this phase initialized
    pub forced: Vec<String>,
    /// Modules left uninitialized after a failed factory
    pub delayed: Vec<String>,
}

impl ModuleReport {
    /// No module registry, or nothing in it
    pub fn is_empty(&self) -> bool {
        self.initialized.is_empty() && self.forced.is_empty() && self.delayed.is_empty()
    }
}

/// Drives module resolution for one serialization.
pub struct Modules<'a> {
    options: &'a SerializerOptions,
    diagnostics: &'a mut DiagnosticLog,
    report: ModuleReport,
}

impl<'a> Modules<'a> {
    /// Create the driver
    pub fn new(options: &'a SerializerOptions, diagnostics: &'a mut DiagnosticLog) -> Self {
        Self {
            options,
            diagnostics,
            report: ModuleReport::default(),
        }
    }

    /// Resolve, then optionally force, the program's modules
    pub fn run(mut self, realm: &mut Realm) -> ModuleReport {
        if !realm.has_module_registry() {
            return self.report;
        }
        self.resolve_initialized_modules(realm);
        if self.options.initialize_more_modules {
            self.initialize_more_modules(realm);
        }
        if self.options.log_modules && !self.report.delayed.is_empty() {
            tracing::info!(
                count = self.report.delayed.len(),
                modules = ?self.report.delayed,
                "delayed modules"
            );
        }
        self.report
    }

    /// Record which modules global code initialized
    pub fn resolve_initialized_modules(&mut self, realm: &Realm) {
        match realm.module_status() {
            Ok(status) => {
                if self.options.log_modules {
                    tracing::info!(
                        count = status.initialized.len(),
                        modules = ?status.initialized,
                        "initialized modules"
                    );
                }
                self.report.initialized = status.initialized;
            }
            Err(error) => self.registry_error(error),
        }
    }

    /// Force every uninitialized module through `require`.
    pub fn initialize_more_modules(&mut self, realm: &mut Realm) {
        let mut pending = match realm.module_status() {
            Ok(status) => status.uninitialized,
            Err(error) => return self.registry_error(error),
        };

        let mut round = 0;
        loop {
            round += 1;
            let mut failed = Vec::new();
            let mut failures = Vec::new();
            let before = pending.len();

            for id in pending {
                // An earlier factory may have required this one already
                if !self.is_uninitialized(realm, &id) {
                    continue;
                }
                match realm.require_module(&id) {
                    Ok(Ok(_)) => {
                        tracing::debug!(module = %id, round, "module initialized");
                        self.report.forced.push(id);
                    }
                    Ok(Err(thrown)) => {
                        failures.push((id.clone(), thrown.message));
                        failed.push(id);
                    }
                    Err(error) => return self.registry_error(error),
                }
            }

            let progressed = failed.len() < before;
            if self.options.accelerate_unsupported_requires && progressed && !failed.is_empty() {
                tracing::debug!(round, retrying = failed.len(), "retrying failed modules");
                pending = failed;
                continue;
            }

            for (id, message) in failures {
                self.module_failed(id, message);
            }
            break;
        }

        if self.options.log_modules {
            tracing::info!(
                count = self.report.forced.len(),
                modules = ?self.report.forced,
                "forced module initialization"
            );
        }
    }

    fn is_uninitialized(&self, realm: &Realm, id: &str) -> bool {
        realm
            .module_status()
            .map(|status| status.uninitialized.iter().any(|m| m == id))
            .unwrap_or(false)
    }

    fn module_failed(&mut self, id: String, message: String) {
        if self.options.delay_unsupported_requires {
            self.diagnostics.push(Diagnostic::warning(
                ErrorCode::MODULE_DELAYED,
                format!("module `{}` was left uninitialized: {}", id, message),
            ));
            self.report.delayed.push(id);
        } else {
            self.diagnostics.push(
                Diagnostic::error(
                    ErrorCode::MODULE_INIT_FAILED,
                    format!("module `{}` failed to initialize: {}", id, message),
                )
                .with_note("set `delay-unsupported-requires` to leave it uninitialized"),
            );
        }
    }

    fn registry_error(&mut self, error: RegistryError) {
        self.diagnostics
            .push(Diagnostic::error(ErrorCode::MALFORMED_REGISTRY, error.to_string()));
    }
}
