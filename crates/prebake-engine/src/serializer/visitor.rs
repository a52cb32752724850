//! Residual heap visitor
//!
//! Breadth-first walk from the global bindings over everything the
//! serialized program must recreate. Uses an explicit work-list so deep
//! or cyclic heaps never grow the native stack.

use crate::interpreter::effects::Location;
use crate::interpreter::environment::EnvId;
use crate::interpreter::heap::{ObjectId, ObjectKind};
use crate::interpreter::value::Value;
use crate::interpreter::Realm;
use crate::serializer::diagnostics::{Diagnostic, DiagnosticLog, ErrorCode};
use crate::serializer::functions::AdditionalFunctionEffects;
use crate::serializer::referentializer::resolve_captures;
use crate::serializer::residual::{
    BindingKey, Referrer, ResidualScope, ResidualSet, ResidualValueInfo, ValueScope,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Computes the `ResidualSet` of a realm.
pub struct ResidualHeapVisitor<'a> {
    realm: &'a Realm,
    effects: &'a [AdditionalFunctionEffects],
    effects_index: FxHashMap<ObjectId, usize>,
    residual: ResidualSet,
    queue: VecDeque<ObjectId>,
    visited: FxHashSet<ObjectId>,
}

impl<'a> ResidualHeapVisitor<'a> {
    /// Create a visitor over `realm` with the extracted additional functions
    pub fn new(realm: &'a Realm, effects: &'a [AdditionalFunctionEffects]) -> Self {
        let effects_index = effects
            .iter()
            .enumerate()
            .map(|(index, effect)| (effect.function, index))
            .collect();
        Self {
            realm,
            effects,
            effects_index,
            residual: ResidualSet::default(),
            queue: VecDeque::new(),
            visited: FxHashSet::default(),
        }
    }

    /// Walk the heap.
    pub fn visit(mut self, diagnostics: &mut DiagnosticLog) -> ResidualSet {
        let realm = self.realm;
        for (name, value) in &realm.envs.global().bindings {
            self.residual.global_roots.push(name.clone());
            self.reach(value, Referrer::Global(name.clone()));
        }
        self.drain();

        for effect in self.effects {
            if self.visited.contains(&effect.function) {
                self.residual.additional_functions.push(effect.function);
            } else {
                diagnostics.push(Diagnostic::warning(
                    ErrorCode::UNREACHABLE_ADDITIONAL_FUNCTION,
                    format!(
                        "additional function `{}` is not reachable from any global binding and will not be emitted",
                        effect.name
                    ),
                ));
                self.residual.unreachable_functions.push(effect.function);
            }
        }

        // Unreachable functions stay in the set for the heap graph
        let unreachable = self.residual.unreachable_functions.clone();
        for function in unreachable {
            self.enqueue(function);
        }
        self.drain();

        self.residual
    }

    fn drain(&mut self) {
        while let Some(id) = self.queue.pop_front() {
            self.visit_object(id);
        }
    }

    fn reach(&mut self, value: &Value, referrer: Referrer) -> Option<ObjectId> {
        let id = value.as_object()?;
        self.enqueue(id);
        if let Some(info) = self.residual.values.get_mut(&id) {
            info.referrers.push(referrer);
        }
        Some(id)
    }

    fn enqueue(&mut self, id: ObjectId) {
        if self.visited.insert(id) {
            let scope = self.object_scope(id);
            self.residual
                .values
                .insert(id, ResidualValueInfo { scope, ..Default::default() });
            self.queue.push_back(id);
        }
    }

    fn visit_object(&mut self, id: ObjectId) {
        let realm = self.realm;
        let Some(object) = realm.heap.get(id) else {
            return;
        };

        if let ObjectKind::Array(elements) = &object.kind {
            for (index, element) in elements.iter().enumerate() {
                self.reach(element, Referrer::Element { object: id, index });
            }
        }
        for (key, value) in &object.properties {
            self.reach(value, Referrer::Property { object: id, key: key.clone() });
        }

        if let ObjectKind::Function(closure) = &object.kind {
            match self.effects_index.get(&id) {
                Some(&index) => self.visit_effects(index),
                None => {
                    let function = resolve_captures(&realm.envs, closure);
                    for key in function.bindings() {
                        self.capture(id, key.clone());
                    }
                    self.residual.functions.insert(id, function);
                }
            }
        }
    }

    fn visit_effects(&mut self, index: usize) {
        let effects = self.effects;
        let effect = &effects[index];
        let function = effect.function;
        for (location, value) in &effect.modifications {
            let referrer = Referrer::Effect { function, location: location.clone() };
            match location {
                Location::Property { object, .. } | Location::Element { object, .. } => {
                    self.reach(&Value::Object(*object), referrer.clone());
                }
                Location::Binding { env, name } if !env.is_global() => {
                    self.capture(function, BindingKey { env: *env, name: name.clone() });
                }
                Location::Binding { .. } => {}
            }
            self.reach(value, referrer);
        }
        self.reach(&effect.result, Referrer::Return(function));
    }

    /// Record that `function` captures `key`, and visit the bound value.
    fn capture(&mut self, function: ObjectId, key: BindingKey) {
        let scope = self.env_scope(key.env);
        let entry = self.residual.scopes.entry(key.env).or_insert_with(|| ResidualScope {
            env: key.env,
            bindings: Default::default(),
            capturing_functions: Default::default(),
            scope,
        });
        entry.bindings.insert(key.name.clone());
        entry.capturing_functions.insert(function);

        let value = self
            .realm
            .envs
            .binding(key.env, &key.name)
            .cloned()
            .unwrap_or(Value::Undefined);
        if let Some(id) = self.reach(&value, Referrer::Binding(key.clone())) {
            if let Some(info) = self.residual.values.get_mut(&id) {
                info.capturing_functions.insert(function);
                info.reading_bindings.insert(key);
            }
        }
    }

    fn object_scope(&self, id: ObjectId) -> ValueScope {
        self.effects
            .iter()
            .find(|effect| effect.owns_object(id))
            .map_or(ValueScope::Global, |effect| ValueScope::Additional(effect.function))
    }

    fn env_scope(&self, env: EnvId) -> ValueScope {
        self.effects
            .iter()
            .find(|effect| effect.owns_env(env))
            .map_or(ValueScope::Global, |effect| ValueScope::Additional(effect.function))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::EnvironmentCutoff;
    use crate::parser::parse_source;
    use crate::serializer::functions::extract_additional_functions;

    fn visit(source: &str) -> (Realm, ResidualSet, DiagnosticLog) {
        let mut realm = Realm::default();
        let unit = parse_source(source, 0).unwrap();
        realm.run_program(&unit.program).unwrap();
        let cutoff = EnvironmentCutoff(realm.envs.next_id());
        let mut diagnostics = DiagnosticLog::new();
        let effects = extract_additional_functions(&mut realm, cutoff, &mut diagnostics).unwrap();
        let residual = ResidualHeapVisitor::new(&realm, &effects).visit(&mut diagnostics);
        (realm, residual, diagnostics)
    }

    fn global(realm: &Realm, name: &str) -> ObjectId {
        realm.global_binding(name).unwrap().as_object().unwrap()
    }

    #[test]
    fn test_breadth_first_order_and_referrers() {
        let (realm, residual, _) = visit("var a = { inner: { deep: 1 } }; var b = [a];");
        let a = global(&realm, "a");
        let b = global(&realm, "b");
        let order: Vec<ObjectId> = residual.values.keys().copied().collect();
        assert_eq!(order[0], a);
        assert_eq!(order[1], b);
        assert_eq!(residual.global_roots, vec!["a", "b"]);

        let referrers = &residual.values[&a].referrers;
        assert_eq!(referrers.len(), 2);
        assert_eq!(referrers[0], Referrer::Global("a".into()));
        assert_eq!(referrers[1], Referrer::Element { object: b, index: 0 });
    }

    #[test]
    fn test_cycles_terminate() {
        let (realm, residual, _) = visit("var x = {}; x.self = x; var y = [x]; y.push(y);");
        assert_eq!(residual.values.len(), 2);
        let x = global(&realm, "x");
        assert_eq!(residual.values[&x].referrers.len(), 3);
    }

    #[test]
    fn test_shared_capture_records_one_scope() {
        let (realm, residual, _) = visit(
            "var make = function () {
               var count = { n: 0 };
               return [function () { return count; }, function () { return count.n; }];
             };
             var pair = make();",
        );
        assert_eq!(residual.scopes.len(), 1);
        let scope = residual.scopes.values().next().unwrap();
        assert_eq!(scope.bindings.len(), 1);
        assert_eq!(scope.capturing_functions.len(), 2);
        assert_eq!(scope.scope, ValueScope::Global);

        let pair = global(&realm, "pair");
        let first = realm.heap.get(pair).unwrap().elements().unwrap()[0].as_object().unwrap();
        assert!(residual.functions.contains_key(&first));
        let captured = residual
            .values
            .values()
            .find(|info| !info.reading_bindings.is_empty())
            .unwrap();
        assert_eq!(captured.capturing_functions.len(), 2);
    }

    #[test]
    fn test_additional_function_values_are_owned() {
        let (realm, residual, diagnostics) = visit(
            "var store = { items: [] };
             function App() { var row = { id: 1 }; store.items = [row]; return row; }
             __optimize(App);",
        );
        let app = global(&realm, "App");
        assert_eq!(residual.additional_functions, vec![app]);
        assert!(!residual.functions.contains_key(&app));
        let owned = residual
            .values
            .values()
            .filter(|info| info.scope == ValueScope::Additional(app))
            .count();
        assert_eq!(owned, 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unreachable_additional_function_warns() {
        let (_, residual, diagnostics) = visit(
            "(function () { __optimize(function () { return 1; }); })();",
        );
        assert_eq!(residual.unreachable_functions.len(), 1);
        assert!(residual.additional_functions.is_empty());
        assert_eq!(diagnostics.with_code(ErrorCode::UNREACHABLE_ADDITIONAL_FUNCTION).count(), 1);
        assert!(!diagnostics.has_errors());
    }
}
