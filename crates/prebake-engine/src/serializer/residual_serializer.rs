//! Residual heap serializer
//!
//! Turns the residual set back into a program that recreates it. The
//! `Emitter` owns the mechanics shared by every serializer variant:
//!
//! - one statement list ("body") for global code plus one per additional
//!   function being emitted; every value is constructed in the body of the
//!   code that created it
//! - a value is declared before anything uses its name
//! - a reference to a value still under construction leaves a placeholder
//!   and a deferred assignment that is flushed right after the value's
//!   declaration
//! - values are written inline or bound to a name as the value identifier
//!   table decides, with names forced where a later statement needs one
//! - construction nests at most `MAX_EMIT_DEPTH` values deep; anything
//!   deeper is postponed to a work-list and patched in like a value under
//!   construction, so long chains never grow the call stack
//!
//! Variants implement `ResidualSerializer` and only decide how ordinary
//! objects are constructed.

use crate::interpreter::effects::Location;
use crate::interpreter::environment::EnvId;
use crate::interpreter::heap::{ObjectId, ObjectKind};
use crate::interpreter::value::Value;
use crate::interpreter::Realm;
use crate::parser::ast::{Expr, FunctionNode, Program, Stmt, VarDecl, VarKind};
use crate::serializer::error::{SerializerError, SerializerResult};
use crate::serializer::functions::AdditionalFunctionEffects;
use crate::serializer::naming::NameGenerator;
use crate::serializer::referentializer::Referentializer;
use crate::serializer::residual::{BindingKey, ResidualSet, ValueScope};
use crate::serializer::statistics::{ReactStatistics, SerializerStatistics};
use crate::serializer::value_ids::{NamingDecision, TableMode, ValueIdentifiers};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::rc::Rc;

/// Prefix of generated value names
pub const VALUE_PREFIX: &str = "_";

/// Deepest chain of values constructed inside one another
pub const MAX_EMIT_DEPTH: usize = 32;

/// Strategy for constructing ordinary objects.
pub trait ResidualSerializer {
    /// Name used in logs
    fn label(&self) -> &'static str;

    /// Expression that constructs the ordinary object `id`
    fn serialize_object(&self, emitter: &mut Emitter<'_>, id: ObjectId) -> SerializerResult<Expr>;
}

/// Plain object literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct EagerSerializer;

impl ResidualSerializer for EagerSerializer {
    fn label(&self) -> &'static str {
        "eager"
    }

    fn serialize_object(&self, emitter: &mut Emitter<'_>, id: ObjectId) -> SerializerResult<Expr> {
        emitter.object_literal(id)
    }
}

/// Everything an emission pass reads.
pub struct EmitContext<'a> {
    /// Interpreter state after additional functions were undone
    pub realm: &'a Realm,
    /// Visitor output
    pub residual: &'a ResidualSet,
    /// Scope storage
    pub referentializer: &'a Referentializer,
    /// Extracted additional functions
    pub effects: &'a [AdditionalFunctionEffects],
}

/// Result of one emission pass.
#[derive(Debug, Clone, Default)]
pub struct EmitOutput {
    /// The generated program
    pub program: Program,
    /// Emission counters
    pub statistics: SerializerStatistics,
    /// Additional function counters
    pub react: ReactStatistics,
}

/// Run one pass of `serializer` over the residual heap.
pub fn serialize_pass(
    serializer: &dyn ResidualSerializer,
    context: &EmitContext<'_>,
    table: &mut ValueIdentifiers,
    names: NameGenerator,
) -> SerializerResult<EmitOutput> {
    tracing::debug!(serializer = serializer.label(), mode = ?table.mode(), "emission pass");
    Emitter::new(context, serializer, table, names).run()
}

/// Something a deferred assignment writes into.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    /// A named value
    Value(ObjectId),
    /// A scope storage array
    Scope(String),
}

/// Where inside the container.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// Named property
    Property(String),
    /// Array element
    Element(usize),
}

#[derive(Debug, Clone)]
struct Deferral {
    container: Container,
    key: Key,
}

#[derive(Debug, Default)]
struct Body {
    stmts: Vec<Stmt>,
}

/// Emission state for one pass.
pub struct Emitter<'a> {
    context: &'a EmitContext<'a>,
    serializer: &'a dyn ResidualSerializer,
    table: &'a mut ValueIdentifiers,
    names: NameGenerator,
    bodies: Vec<Body>,
    current: usize,
    deferred: bool,
    depth: usize,
    postponed: VecDeque<ObjectId>,
    additional_bodies: FxHashMap<ObjectId, usize>,
    effects_index: FxHashMap<ObjectId, usize>,
    value_names: FxHashMap<ObjectId, String>,
    emitted: FxHashSet<ObjectId>,
    in_progress: FxHashSet<ObjectId>,
    forced: FxHashSet<ObjectId>,
    pending: FxHashMap<ObjectId, Vec<Deferral>>,
    declared_scopes: FxHashSet<EnvId>,
    scopes_in_progress: FxHashSet<EnvId>,
    statistics: SerializerStatistics,
    react: ReactStatistics,
}

impl<'a> Emitter<'a> {
    fn new(
        context: &'a EmitContext<'a>,
        serializer: &'a dyn ResidualSerializer,
        table: &'a mut ValueIdentifiers,
        names: NameGenerator,
    ) -> Self {
        let effects_index = context
            .effects
            .iter()
            .enumerate()
            .map(|(index, effect)| (effect.function, index))
            .collect();
        Self {
            context,
            serializer,
            table,
            names,
            bodies: vec![Body::default()],
            current: 0,
            deferred: false,
            depth: 0,
            postponed: VecDeque::new(),
            additional_bodies: FxHashMap::default(),
            effects_index,
            value_names: FxHashMap::default(),
            emitted: FxHashSet::default(),
            in_progress: FxHashSet::default(),
            forced: FxHashSet::default(),
            pending: FxHashMap::default(),
            declared_scopes: FxHashSet::default(),
            scopes_in_progress: FxHashSet::default(),
            statistics: SerializerStatistics::default(),
            react: ReactStatistics::default(),
        }
    }

    /// Emit every global binding in insertion order.
    fn run(mut self) -> SerializerResult<EmitOutput> {
        let realm = self.context.realm;
        let residual = self.context.residual;
        for name in &residual.global_roots {
            let value = realm.global_binding(name).cloned().unwrap_or(Value::Undefined);
            let stmt = match value {
                Value::Undefined => Stmt::Var(VarDecl {
                    kind: VarKind::Var,
                    name: name.clone(),
                    ty: None,
                    init: None,
                }),
                value => {
                    let init = self.serialize_value(&value)?;
                    Stmt::var(name.clone(), init)
                }
            };
            self.bodies[0].stmts.push(stmt);
            self.drain_postponed()?;
        }

        if let Some((id, _)) = self.pending.iter().next() {
            return Err(SerializerError::internal(format!(
                "deferred assignments to {} were never flushed",
                id
            )));
        }

        let body = std::mem::take(&mut self.bodies[0].stmts);
        Ok(EmitOutput {
            program: Program { body },
            statistics: self.statistics,
            react: self.react,
        })
    }

    // ========================================================================
    // Helpers for serializer variants
    // ========================================================================

    /// Own properties of `id`, in insertion order
    pub fn properties(&self, id: ObjectId) -> SerializerResult<Vec<(String, Value)>> {
        let object = self
            .context
            .realm
            .heap
            .get(id)
            .ok_or_else(|| SerializerError::internal(format!("unknown object {}", id)))?;
        Ok(object
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    /// Fresh identifier with `prefix`
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        self.names.generate(prefix)
    }

    /// Mutable emission counters
    pub fn statistics_mut(&mut self) -> &mut SerializerStatistics {
        &mut self.statistics
    }

    /// Run `f` in code that executes after the current body has finished,
    /// where references to values under construction need no placeholder.
    pub fn with_deferred<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.deferred;
        self.deferred = true;
        let result = f(self);
        self.deferred = saved;
        result
    }

    /// `{ key: value, ... }` for an ordinary object.
    ///
    /// Properties that point at a value under construction become
    /// `undefined` placeholders. The deferred assignment overwrites the
    /// placeholder in place, so the literal fixes the key order.
    pub fn object_literal(&mut self, id: ObjectId) -> SerializerResult<Expr> {
        let mut properties = Vec::new();
        for (key, value) in self.properties(id)? {
            let expr = self
                .serialize_child(&value, Container::Value(id), Key::Property(key.clone()))?
                .unwrap_or(Expr::Undefined);
            properties.push((key, expr));
        }
        self.statistics.objects += 1;
        Ok(Expr::Object(properties))
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Expression for `value` at a position no later statement can patch.
    pub fn serialize_value(&mut self, value: &Value) -> SerializerResult<Expr> {
        Ok(match value {
            Value::Undefined => Expr::Undefined,
            Value::Null => Expr::Null,
            Value::Bool(b) => Expr::Bool(*b),
            Value::Number(n) => Expr::Number(*n),
            Value::String(s) => Expr::String(s.to_string()),
            Value::Object(id) => self.serialize_object_ref(*id)?,
        })
    }

    /// Expression for `value` stored at `key` of `container`, or `None`
    /// when the value is still under construction and a deferred
    /// assignment was registered instead.
    pub fn serialize_child(
        &mut self,
        value: &Value,
        container: Container,
        key: Key,
    ) -> SerializerResult<Option<Expr>> {
        if let Value::Object(id) = value {
            let id = *id;
            if self.in_progress.contains(&id)
                && !self.deferred
                && self.body_of(self.context.residual.scope_of(id))? == self.current
            {
                self.table.reference(id);
                self.forced.insert(id);
                if let Container::Value(holder) = &container {
                    self.forced.insert(*holder);
                }
                self.pending.entry(id).or_default().push(Deferral { container, key });
                self.statistics.deferred_assignments += 1;
                return Ok(None);
            }
            if self.depth >= MAX_EMIT_DEPTH
                && !self.emitted.contains(&id)
                && !self.in_progress.contains(&id)
                && self.body_of(self.context.residual.scope_of(id))? == self.current
            {
                return Ok(self.postpone(id, container, key));
            }
        }
        self.serialize_value(value).map(Some)
    }

    /// Queue `id` for construction once the current chain has unwound.
    ///
    /// In deferred code the name can be used directly; elsewhere the slot
    /// gets a placeholder and a deferred assignment, as for a value under
    /// construction.
    fn postpone(&mut self, id: ObjectId, container: Container, key: Key) -> Option<Expr> {
        self.table.reference(id);
        self.forced.insert(id);
        self.postponed.push_back(id);
        if self.deferred {
            return Some(Expr::Ident(self.name_of(id)));
        }
        if let Container::Value(holder) = &container {
            self.forced.insert(*holder);
        }
        self.pending.entry(id).or_default().push(Deferral { container, key });
        self.statistics.deferred_assignments += 1;
        None
    }

    /// Construct every postponed value, including those postponed while
    /// draining.
    fn drain_postponed(&mut self) -> SerializerResult<()> {
        while let Some(id) = self.postponed.pop_front() {
            if self.emitted.contains(&id) || self.in_progress.contains(&id) {
                continue;
            }
            self.construct(id)?;
        }
        Ok(())
    }

    fn serialize_object_ref(&mut self, id: ObjectId) -> SerializerResult<Expr> {
        self.table.reference(id);
        if self.in_progress.contains(&id) {
            self.forced.insert(id);
            return Ok(Expr::Ident(self.name_of(id)));
        }
        if self.emitted.contains(&id) {
            return match self.value_names.get(&id) {
                Some(name) => Ok(Expr::Ident(name.clone())),
                None => Err(SerializerError::internal(format!(
                    "{} referenced again after being inlined",
                    id
                ))),
            };
        }
        self.construct(id)
    }

    fn decision(&self, id: ObjectId) -> SerializerResult<NamingDecision> {
        match self.table.mode() {
            TableMode::Counting => Ok(NamingDecision::Bind),
            TableMode::Finalized => self.table.naming_decision(id),
        }
    }

    fn name_of(&mut self, id: ObjectId) -> String {
        if let Some(name) = self.value_names.get(&id) {
            return name.clone();
        }
        let name = self.names.generate(VALUE_PREFIX);
        self.value_names.insert(id, name.clone());
        name
    }

    fn body_of(&self, scope: ValueScope) -> SerializerResult<usize> {
        match scope {
            ValueScope::Global => Ok(0),
            ValueScope::Additional(function) => {
                self.additional_bodies.get(&function).copied().ok_or_else(|| {
                    SerializerError::internal(format!(
                        "value of additional function {} used outside its body",
                        function
                    ))
                })
            }
        }
    }

    /// Construct `id` in its owner's body; declare it when it needs a name.
    fn construct(&mut self, id: ObjectId) -> SerializerResult<Expr> {
        let scope = self.context.residual.scope_of(id);
        let owner = self.body_of(scope)?;
        let bound = self.decision(id)? == NamingDecision::Bind || owner != self.current;

        let saved = (self.current, self.deferred);
        self.current = owner;
        self.deferred = false;
        self.depth += 1;
        self.in_progress.insert(id);
        let constructed = self.construct_expr(id, scope);
        self.in_progress.remove(&id);
        self.emitted.insert(id);

        let result = constructed.and_then(|expr| {
            let post = self.post_properties(id)?;
            let named = bound
                || !post.is_empty()
                || self.forced.contains(&id)
                || self.pending.contains_key(&id);
            if !named {
                self.statistics.inlined_values += 1;
                return Ok(expr);
            }
            let name = self.name_of(id);
            self.push(Stmt::var(name.clone(), expr));
            self.statistics.declarations += 1;
            self.flush(id, &name);
            self.emit_post_properties(id, &name, post)?;
            Ok(Expr::Ident(name))
        });

        self.depth -= 1;
        self.current = saved.0;
        self.deferred = saved.1;
        result
    }

    fn construct_expr(&mut self, id: ObjectId, scope: ValueScope) -> SerializerResult<Expr> {
        let realm = self.context.realm;
        let object = realm
            .heap
            .get(id)
            .ok_or_else(|| SerializerError::internal(format!("unknown object {}", id)))?;
        match &object.kind {
            ObjectKind::Ordinary => {
                let serializer = self.serializer;
                serializer.serialize_object(self, id)
            }
            ObjectKind::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let item = self.serialize_child(element, Container::Value(id), Key::Element(index))?;
                    items.push(item.unwrap_or(Expr::Undefined));
                }
                self.statistics.arrays += 1;
                Ok(Expr::Array(items))
            }
            ObjectKind::Function(closure) => {
                if let Some(&index) = self.effects_index.get(&id) {
                    return self.additional_function(index, &closure.node);
                }
                let residual = self.context.residual;
                let function = residual.functions.get(&id).ok_or_else(|| {
                    SerializerError::internal(format!("function {} was not visited", id))
                })?;
                let mut envs: Vec<EnvId> = Vec::new();
                for key in function.bindings() {
                    if !envs.contains(&key.env) {
                        envs.push(key.env);
                    }
                }
                for env in envs {
                    self.ensure_scope(env)?;
                }
                let mut node = self.context.referentializer.rewrite_function(&closure.node, function);
                if node.is_declaration {
                    node.name = None;
                    node.is_declaration = false;
                }
                self.statistics.functions += 1;
                if matches!(scope, ValueScope::Additional(_)) {
                    self.react.nested_closures += 1;
                }
                Ok(Expr::Function(Rc::new(node)))
            }
        }
    }

    /// Properties emitted as assignments after the declaration: everything
    /// an array or function carries besides its elements or code.
    fn post_properties(&self, id: ObjectId) -> SerializerResult<Vec<(String, Value)>> {
        let is_ordinary = self
            .context
            .realm
            .heap
            .get(id)
            .is_some_and(|object| matches!(object.kind, ObjectKind::Ordinary));
        if is_ordinary {
            return Ok(Vec::new());
        }
        self.properties(id)
    }

    /// A property waiting for a deferred assignment is still created here,
    /// as `undefined`, so later keys keep their place after it.
    fn emit_post_properties(
        &mut self,
        id: ObjectId,
        name: &str,
        properties: Vec<(String, Value)>,
    ) -> SerializerResult<()> {
        for (key, value) in properties {
            let target = Expr::member(Expr::ident(name), &key);
            let expr = self
                .serialize_child(&value, Container::Value(id), Key::Property(key))?
                .unwrap_or(Expr::Undefined);
            self.push(Stmt::Expr(Expr::assign(target, expr)));
        }
        Ok(())
    }

    /// Emit the deferred assignments waiting for `id`.
    fn flush(&mut self, id: ObjectId, name: &str) {
        let Some(deferrals) = self.pending.remove(&id) else {
            return;
        };
        for deferral in deferrals {
            let container = match &deferral.container {
                Container::Value(holder) => Expr::Ident(self.name_of(*holder)),
                Container::Scope(scope) => Expr::ident(scope.clone()),
            };
            let target = match &deferral.key {
                Key::Property(key) => Expr::member(container, key),
                Key::Element(index) => Expr::element(container, *index),
            };
            self.push(Stmt::Expr(Expr::assign(target, Expr::ident(name))));
        }
    }

    fn push(&mut self, stmt: Stmt) {
        self.bodies[self.current].stmts.push(stmt);
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Declare the storage array of `env` in its owner's body.
    fn ensure_scope(&mut self, env: EnvId) -> SerializerResult<()> {
        if self.declared_scopes.contains(&env) || self.scopes_in_progress.contains(&env) {
            return Ok(());
        }
        let residual = self.context.residual;
        let scope = residual
            .scopes
            .get(&env)
            .ok_or_else(|| SerializerError::internal(format!("{} was not visited", env)))?;
        let name = self
            .context
            .referentializer
            .scope_name(env)
            .ok_or_else(|| SerializerError::internal(format!("{} has no storage", env)))?
            .to_string();
        let owner = self.body_of(scope.scope)?;

        let saved = (self.current, self.deferred);
        self.current = owner;
        self.deferred = false;
        self.scopes_in_progress.insert(env);

        let realm = self.context.realm;
        let mut elements = Vec::with_capacity(scope.bindings.len());
        let mut failure = None;
        for (slot, binding) in scope.bindings.iter().enumerate() {
            let value = realm.envs.binding(env, binding).cloned().unwrap_or(Value::Undefined);
            match self.serialize_child(&value, Container::Scope(name.clone()), Key::Element(slot)) {
                Ok(expr) => elements.push(expr.unwrap_or(Expr::Undefined)),
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        self.scopes_in_progress.remove(&env);
        self.declared_scopes.insert(env);
        if failure.is_none() {
            self.push(Stmt::var(name, Expr::Array(elements)));
            self.statistics.scopes += 1;
            self.statistics.referentialized_bindings += scope.bindings.len();
        }
        self.current = saved.0;
        self.deferred = saved.1;
        failure.map_or(Ok(()), Err)
    }

    /// `scope[slot]` for a captured binding, declaring the scope if needed
    fn binding_target(&mut self, key: &BindingKey) -> SerializerResult<Expr> {
        self.ensure_scope(key.env)?;
        self.context
            .referentializer
            .capture_binding(key)
            .map(|binding| binding.to_expr())
            .ok_or_else(|| SerializerError::internal(format!("{} has no storage slot", key)))
    }

    // ========================================================================
    // Additional functions
    // ========================================================================

    /// A function whose body recreates the additional function's own
    /// values, applies its modifications and returns its result.
    fn additional_function(&mut self, index: usize, original: &FunctionNode) -> SerializerResult<Expr> {
        let context = self.context;
        let effects = &context.effects[index];
        let body = self.bodies.len();
        self.bodies.push(Body::default());
        self.additional_bodies.insert(effects.function, body);

        // Values postponed inside the body are constructed before it returns
        let outer = std::mem::take(&mut self.postponed);
        let saved = (self.current, self.deferred);
        self.current = body;
        self.deferred = false;
        let built = self.additional_body(effects);
        self.current = saved.0;
        self.deferred = saved.1;
        self.postponed = outer;
        built?;

        let stmts = std::mem::take(&mut self.bodies[body].stmts);
        let name = if original.is_declaration { None } else { original.name.clone() };
        let node = FunctionNode {
            name,
            params: original.params.clone(),
            return_ty: original.return_ty.clone(),
            body: stmts,
            is_declaration: false,
            unit: original.unit,
            span: original.span,
        };
        self.statistics.functions += 1;
        self.statistics.additional_functions += 1;
        self.react.optimized_trees += 1;
        Ok(Expr::Function(Rc::new(node)))
    }

    fn additional_body(&mut self, effects: &AdditionalFunctionEffects) -> SerializerResult<()> {
        for (location, value) in &effects.modifications {
            let target = match location {
                Location::Property { object, key } => {
                    let holder = self.serialize_value(&Value::Object(*object))?;
                    Expr::member(holder, key)
                }
                Location::Element { object, index } => {
                    let holder = self.serialize_value(&Value::Object(*object))?;
                    Expr::element(holder, *index)
                }
                Location::Binding { env, name } if env.is_global() => Expr::ident(name.clone()),
                Location::Binding { env, name } => {
                    self.binding_target(&BindingKey { env: *env, name: name.clone() })?
                }
            };
            let value = self.serialize_value(value)?;
            self.push(Stmt::Expr(Expr::assign(target, value)));
        }
        let result = match &effects.result {
            Value::Undefined => None,
            value => Some(self.serialize_value(value)?),
        };
        self.drain_postponed()?;
        self.push(Stmt::Return(result));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::EnvironmentCutoff;
    use crate::parser::{parse_source, print_program};
    use crate::serializer::diagnostics::DiagnosticLog;
    use crate::serializer::functions::extract_additional_functions;
    use crate::serializer::visitor::ResidualHeapVisitor;

    fn emit(source: &str, inline: bool) -> (String, SerializerStatistics) {
        let mut realm = Realm::default();
        let unit = parse_source(source, 0).unwrap();
        realm.run_program(&unit.program).unwrap();
        let cutoff = EnvironmentCutoff(realm.envs.next_id());
        let mut diagnostics = DiagnosticLog::new();
        let effects = extract_additional_functions(&mut realm, cutoff, &mut diagnostics).unwrap();
        let residual = ResidualHeapVisitor::new(&realm, &effects).visit(&mut diagnostics);
        let mut names = NameGenerator::new(unit.identifiers.iter().cloned());
        let referentializer = Referentializer::new(&residual, &mut names);
        let context = EmitContext {
            realm: &realm,
            residual: &residual,
            referentializer: &referentializer,
            effects: &effects,
        };
        let mut table = ValueIdentifiers::new();
        if inline {
            table.init_pass1();
            serialize_pass(&EagerSerializer, &context, &mut table, names.clone()).unwrap();
            table.init_pass2().unwrap();
        } else {
            table.finalize_conservative();
        }
        let output = serialize_pass(&EagerSerializer, &context, &mut table, names).unwrap();
        (print_program(&output.program), output.statistics)
    }

    #[test]
    fn test_self_reference_is_patched_after_declaration() {
        let (code, stats) = emit("var x = {}; x.self = x;", true);
        assert_eq!(code, "var _0 = { self: undefined };\n_0.self = _0;\nvar x = _0;\n");
        assert_eq!(stats.deferred_assignments, 1);
    }

    #[test]
    fn test_single_use_values_are_inlined() {
        let (code, _) = emit("var a = { b: { c: [1, 2] } };", true);
        assert_eq!(code, "var a = { b: { c: [1, 2] } };\n");
        let (code, stats) = emit("var a = { b: { c: [1, 2] } };", false);
        assert_eq!(stats.declarations, 3);
        assert!(code.ends_with("var a = _2;\n"));
    }

    #[test]
    fn test_shared_values_are_bound() {
        let (code, _) = emit("var shared = { n: 1 }; var a = [shared, shared];", true);
        assert_eq!(code, "var _0 = { n: 1 };\nvar shared = _0;\nvar a = [_0, _0];\n");
    }

    #[test]
    fn test_placeholder_keeps_property_order() {
        let (code, _) = emit("var p = {}; p.first = p; p.second = 2;", true);
        assert_eq!(
            code,
            "var _0 = { first: undefined, second: 2 };\n_0.first = _0;\nvar p = _0;\n"
        );
    }

    #[test]
    fn test_two_placeholders_in_one_holder() {
        let (code, _) = emit(
            "var root = (function () {
               var o0 = {}; var o1 = {}; var o2 = {};
               o0.c = o1; o1.c = o2; o2.a = o0; o2.b = o1;
               return o0;
             })();",
            true,
        );
        assert_eq!(
            code,
            "var _0 = { a: undefined, b: undefined };\nvar _1 = { c: _0 };\n_0.b = _1;\nvar _2 = { c: _1 };\n_0.a = _2;\nvar root = _2;\n"
        );
    }

    #[test]
    fn test_deep_chains_are_cut_into_named_segments() {
        let (code, stats) = emit(
            "var head = null; var i = 0; while (i < 100) { head = { next: head }; i++; }",
            true,
        );
        let mut depth = 0usize;
        let mut deepest = 0usize;
        for c in code.chars() {
            match c {
                '{' => {
                    depth += 1;
                    deepest = deepest.max(depth);
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        assert_eq!(deepest, MAX_EMIT_DEPTH);
        // Nodes 33, 65 and 97 start a new segment below a named holder
        assert_eq!(stats.deferred_assignments, 3);
        assert_eq!(stats.declarations, 6);
        assert_eq!(stats.objects, 100);
    }

    #[test]
    fn test_closure_captures_go_through_scope_storage() {
        let (code, stats) = emit(
            "var counter = (function () {
               var n = 0;
               return { inc: function () { n++; return n; }, get: function () { return n; } };
             })();",
            true,
        );
        assert!(code.starts_with("var __scope_0 = [0];\n"));
        assert!(code.contains("__scope_0[0]++;"));
        assert!(code.contains("return __scope_0[0];"));
        assert_eq!(stats.scopes, 1);
        assert_eq!(stats.referentialized_bindings, 1);
    }

    #[test]
    fn test_function_capturing_itself() {
        let (code, _) = emit(
            "var f = (function () { var self = function () { return self; }; return self; })();",
            true,
        );
        assert!(code.starts_with("var __scope_0 = [undefined];\n"));
        assert!(code.contains("__scope_0[0] = _0;\n"));
        assert!(code.ends_with("var f = _0;\n"));
    }

    #[test]
    fn test_additional_function_body_replays_effects() {
        let (code, stats) = emit(
            "var store = { count: 0 };
             function App() { store.count = store.count + 1; return { ok: true }; }
             __optimize(App);",
            true,
        );
        assert!(code.contains("var _0 = { count: 0 };\n"));
        assert!(code.contains("_0.count = 1;"));
        assert!(code.contains("return { ok: true };"));
        assert!(code.contains("var App = function () {"));
        assert_eq!(stats.additional_functions, 1);
    }
}
