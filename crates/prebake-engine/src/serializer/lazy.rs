//! Lazy object serializer.
//!
//! Non-empty ordinary objects are emitted as
//! `<runtime>.createLazyObject(function (obj) { obj.key = value; })`. The
//! runtime decides when the thunk runs, so property values inside it may
//! name values that are still under construction without a placeholder.

use crate::interpreter::heap::ObjectId;
use crate::parser::ast::{Expr, FunctionNode, Param, Stmt};
use crate::parser::token::Span;
use crate::serializer::error::SerializerResult;
use crate::serializer::residual_serializer::{Container, Emitter, Key, ResidualSerializer};
use std::rc::Rc;

/// Method the runtime object must provide
pub const CREATE_LAZY_OBJECT: &str = "createLazyObject";

/// Prefix of thunk parameters
const LAZY_PARAM_PREFIX: &str = "__lazy";

/// Emits ordinary objects through a lazy-object runtime.
#[derive(Debug, Clone)]
pub struct LazySerializer {
    runtime: String,
}

impl LazySerializer {
    /// Serializer calling into the global named `runtime`
    pub fn new(runtime: impl Into<String>) -> Self {
        Self { runtime: runtime.into() }
    }

    /// Name of the runtime global
    pub fn runtime(&self) -> &str {
        &self.runtime
    }
}

impl ResidualSerializer for LazySerializer {
    fn label(&self) -> &'static str {
        "lazy"
    }

    fn serialize_object(&self, emitter: &mut Emitter<'_>, id: ObjectId) -> SerializerResult<Expr> {
        let properties = emitter.properties(id)?;
        if properties.is_empty() {
            return emitter.object_literal(id);
        }

        let param = emitter.fresh_name(LAZY_PARAM_PREFIX);
        let body = emitter.with_deferred(|emitter| -> SerializerResult<Vec<Stmt>> {
            let mut body = Vec::with_capacity(properties.len());
            for (key, value) in properties {
                let target = Expr::member(Expr::ident(param.clone()), &key);
                if let Some(expr) =
                    emitter.serialize_child(&value, Container::Value(id), Key::Property(key))?
                {
                    body.push(Stmt::Expr(Expr::assign(target, expr)));
                }
            }
            Ok(body)
        })?;

        let thunk = FunctionNode {
            name: None,
            params: vec![Param { name: param, ty: None }],
            return_ty: None,
            body,
            is_declaration: false,
            unit: 0,
            span: Span::default(),
        };
        let statistics = emitter.statistics_mut();
        statistics.objects += 1;
        statistics.lazy_objects += 1;
        Ok(Expr::call(
            Expr::member(Expr::ident(self.runtime.clone()), CREATE_LAZY_OBJECT),
            vec![Expr::Function(Rc::new(thunk))],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::EnvironmentCutoff;
    use crate::interpreter::Realm;
    use crate::parser::{parse_source, print_program};
    use crate::serializer::diagnostics::DiagnosticLog;
    use crate::serializer::functions::extract_additional_functions;
    use crate::serializer::naming::NameGenerator;
    use crate::serializer::referentializer::Referentializer;
    use crate::serializer::residual_serializer::{serialize_pass, EmitContext};
    use crate::serializer::value_ids::ValueIdentifiers;
    use crate::serializer::visitor::ResidualHeapVisitor;

    fn emit_lazy(source: &str) -> String {
        let mut realm = Realm::default();
        let unit = parse_source(source, 0).unwrap();
        realm.run_program(&unit.program).unwrap();
        let cutoff = EnvironmentCutoff(realm.envs.next_id());
        let mut diagnostics = DiagnosticLog::new();
        let effects = extract_additional_functions(&mut realm, cutoff, &mut diagnostics).unwrap();
        let residual = ResidualHeapVisitor::new(&realm, &effects).visit(&mut diagnostics);
        let mut names = NameGenerator::new(unit.identifiers.iter().cloned());
        names.reserve("__rt");
        let referentializer = Referentializer::new(&residual, &mut names);
        let context = EmitContext {
            realm: &realm,
            residual: &residual,
            referentializer: &referentializer,
            effects: &effects,
        };
        let serializer = LazySerializer::new("__rt");
        let mut table = ValueIdentifiers::new();
        table.init_pass1();
        serialize_pass(&serializer, &context, &mut table, names.clone()).unwrap();
        table.init_pass2().unwrap();
        let output = serialize_pass(&serializer, &context, &mut table, names).unwrap();
        print_program(&output.program)
    }

    #[test]
    fn test_objects_become_thunks() {
        let code = emit_lazy("var o = { a: 1, b: 'x' };");
        assert_eq!(
            code,
            "var o = __rt.createLazyObject(function (__lazy0) {\n  __lazy0.a = 1;\n  __lazy0.b = \"x\";\n});\n"
        );
    }

    #[test]
    fn test_empty_objects_stay_literals() {
        assert_eq!(emit_lazy("var o = {};"), "var o = {};\n");
    }

    #[test]
    fn test_cycles_need_no_placeholder() {
        let code = emit_lazy("var o = { n: 1 }; o.self = o;");
        assert_eq!(
            code,
            "var _0 = __rt.createLazyObject(function (__lazy0) {\n  __lazy0.n = 1;\n  __lazy0.self = _0;\n});\nvar o = _0;\n"
        );
    }
}
