//! Additional functions: extraction and independence check.
//!
//! Every function registered through `__optimize` is called once with no
//! arguments inside its own recording session. The sessions run in
//! registration order with their effects applied in sequence; once all of
//! them are recorded they are checked against each other and then undone
//! in reverse, except for writes to state the function created itself.

use crate::interpreter::effects::{EffectsRecord, Location};
use crate::interpreter::environment::{EnvId, EnvironmentCutoff};
use crate::interpreter::heap::ObjectId;
use crate::interpreter::value::Value;
use crate::interpreter::Realm;
use crate::serializer::diagnostics::{Diagnostic, DiagnosticLog, ErrorCode};
use crate::serializer::error::{SerializerError, SerializerResult};
use rustc_hash::FxHashSet;

/// What one additional function did, as seen from pre-existing state.
#[derive(Debug, Clone)]
pub struct AdditionalFunctionEffects {
    /// The function object
    pub function: ObjectId,
    /// Name used in diagnostics
    pub name: String,
    /// Final values of modified pre-existing locations, in first-write order
    pub modifications: Vec<(Location, Value)>,
    /// Return value
    pub result: Value,
    /// Objects the function created
    pub created_objects: FxHashSet<ObjectId>,
    /// Environments the function created
    pub created_envs: FxHashSet<EnvId>,
}

impl AdditionalFunctionEffects {
    /// True when `object` was created by this function
    pub fn owns_object(&self, object: ObjectId) -> bool {
        self.created_objects.contains(&object)
    }

    /// True when `env` was created by this function
    pub fn owns_env(&self, env: EnvId) -> bool {
        self.created_envs.contains(&env)
    }
}

struct Run {
    function: ObjectId,
    name: String,
    record: EffectsRecord,
    result: Value,
    modifications: Vec<(Location, Value)>,
}

/// Run, check and extract every registered additional function.
///
/// Functions that are not callable or that throw are reported as error
/// diagnostics and skipped; conflicting functions are fatal.
pub fn extract_additional_functions(
    realm: &mut Realm,
    cutoff: EnvironmentCutoff,
    diagnostics: &mut DiagnosticLog,
) -> SerializerResult<Vec<AdditionalFunctionEffects>> {
    let registered = realm.additional_functions().to_vec();
    let mut runs: Vec<Run> = Vec::new();

    for value in registered {
        let function = match value.as_object() {
            Some(id) if value.type_of(&realm.heap) == "function" => id,
            _ => {
                diagnostics.push(Diagnostic::error(
                    ErrorCode::NOT_A_FUNCTION,
                    format!("`__optimize` expects a function, got {}", value),
                ));
                continue;
            }
        };
        let name = function_name(realm, function);
        tracing::debug!(function = %name, "running additional function");

        realm.generator.begin(format!("additional {}", name));
        let outcome = realm.call(&value, Vec::new());
        let record = realm.generator.end().unwrap_or_default();

        match outcome {
            Ok(result) => {
                let modifications = record
                    .written_locations()
                    .into_iter()
                    .filter(|location| !record.owns(location))
                    .map(|location| {
                        let value = realm.location_value(&location);
                        (location, value)
                    })
                    .collect();
                runs.push(Run { function, name, record, result, modifications });
            }
            Err(thrown) => {
                realm.undo(&record, false);
                diagnostics.push(Diagnostic::error(
                    ErrorCode::ADDITIONAL_FUNCTION_THREW,
                    format!("additional function `{}` threw: {}", name, thrown.message),
                ));
            }
        }
    }

    if let Err(error) = check_independence(&runs, cutoff) {
        diagnostics.push(Diagnostic::error(ErrorCode::INDEPENDENCE_VIOLATION, error.to_string()));
        return Err(error);
    }

    for run in runs.iter().rev() {
        realm.undo(&run.record, true);
    }

    Ok(runs
        .into_iter()
        .map(|run| AdditionalFunctionEffects {
            function: run.function,
            name: run.name,
            modifications: run.modifications,
            result: run.result,
            created_objects: run.record.created_objects,
            created_envs: run.record.created_envs,
        })
        .collect())
}

/// Verify that no function touches state another one created, and that
/// no two functions conflict on pre-existing state.
fn check_independence(runs: &[Run], cutoff: EnvironmentCutoff) -> SerializerResult<()> {
    let violation = |function: &Run, other: &Run, location: &Location| {
        SerializerError::IndependenceViolation {
            function: function.name.clone(),
            other: other.name.clone(),
            location: location.to_string(),
        }
    };

    for function in runs {
        let written = function.record.written_locations();
        let touched = function.record.reads.iter().chain(written.iter());

        // State created by another additional function
        for location in touched {
            for other in runs.iter().filter(|o| o.function != function.function) {
                let foreign = match location {
                    Location::Binding { env, .. } => {
                        !cutoff.is_global_code(*env) && other.record.created_envs.contains(env)
                    }
                    _ => location
                        .object()
                        .is_some_and(|object| other.record.created_objects.contains(&object)),
                };
                if foreign {
                    return Err(violation(function, other, location));
                }
            }
        }

        // Conflicting access to pre-existing state
        for location in written.iter().filter(|l| !function.record.owns(l)) {
            for other in runs.iter().filter(|o| o.function != function.function) {
                let other_writes = other
                    .record
                    .writes
                    .iter()
                    .any(|w| &w.location == location);
                if other_writes || other.record.reads.contains(location) {
                    return Err(violation(function, other, location));
                }
            }
        }
    }
    Ok(())
}

/// Prefer the global binding that holds the function, then its own name.
fn function_name(realm: &Realm, function: ObjectId) -> String {
    let global = realm
        .envs
        .global()
        .bindings
        .iter()
        .find(|(_, value)| value.as_object() == Some(function))
        .map(|(name, _)| name.clone());
    global.unwrap_or_else(|| {
        realm
            .heap
            .get(function)
            .and_then(|object| object.as_closure())
            .map_or_else(|| function.to_string(), |c| c.node.display_name().to_string())
    })
}
