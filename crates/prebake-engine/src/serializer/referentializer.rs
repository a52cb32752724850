//! Referentializer
//!
//! Resolves the free names of residual functions against their
//! environment chains, gives every captured non-global environment a
//! storage array and rewrites function bodies to go through it. Closures
//! that captured the same binding end up reading and writing the same
//! array slot.

use crate::interpreter::environment::{EnvId, EnvironmentArena};
use crate::interpreter::heap::Closure;
use crate::parser::ast::{Expr, FunctionNode, Stmt, VarDecl};
use crate::parser::captures::{analyze_function, bound_names};
use crate::serializer::naming::NameGenerator;
use crate::serializer::residual::{
    BindingKey, CaptureTarget, ResidualFunction, ResidualSet, ResolvedCapture,
};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Prefix of scope storage arrays
pub const SCOPE_PREFIX: &str = "__scope_";

/// Resolve the free names of `closure` through its environment chain.
pub fn resolve_captures(envs: &EnvironmentArena, closure: &Closure) -> ResidualFunction {
    let captures = analyze_function(&closure.node)
        .captures
        .into_iter()
        .map(|capture| {
            let target = match envs.resolve(closure.env, &capture.name) {
                Some(env) if !env.is_global() => CaptureTarget::Binding(BindingKey {
                    env,
                    name: capture.name.clone(),
                }),
                _ => CaptureTarget::Global,
            };
            ResolvedCapture { name: capture.name, target }
        })
        .collect();
    ResidualFunction { captures }
}

/// Storage slot of a captured binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBinding {
    /// Name of the scope array
    pub scope: String,
    /// Index in the array
    pub slot: usize,
}

impl CaptureBinding {
    /// `scope[slot]`
    pub fn to_expr(&self) -> Expr {
        Expr::element(Expr::ident(self.scope.clone()), self.slot)
    }
}

/// Scope array names and slots for one serialization.
#[derive(Debug, Clone, Default)]
pub struct Referentializer {
    scope_names: IndexMap<EnvId, String>,
    bindings: FxHashMap<BindingKey, CaptureBinding>,
}

impl Referentializer {
    /// Allocate a scope array per captured environment.
    pub fn new(residual: &ResidualSet, names: &mut NameGenerator) -> Self {
        let mut referentializer = Self::default();
        for (env, scope) in &residual.scopes {
            let scope_name = names.generate(SCOPE_PREFIX);
            for (slot, binding) in scope.bindings.iter().enumerate() {
                referentializer.bindings.insert(
                    BindingKey { env: *env, name: binding.clone() },
                    CaptureBinding { scope: scope_name.clone(), slot },
                );
            }
            referentializer.scope_names.insert(*env, scope_name);
        }
        referentializer
    }

    /// Scope array name of `env`
    pub fn scope_name(&self, env: EnvId) -> Option<&str> {
        self.scope_names.get(&env).map(String::as_str)
    }

    /// Slot of a captured binding
    pub fn capture_binding(&self, key: &BindingKey) -> Option<&CaptureBinding> {
        self.bindings.get(key)
    }

    /// Number of scope arrays
    pub fn scope_count(&self) -> usize {
        self.scope_names.len()
    }

    /// Copy of `node` whose captured names go through scope storage.
    pub fn rewrite_function(&self, node: &FunctionNode, function: &ResidualFunction) -> FunctionNode {
        let map: FxHashMap<String, Expr> = function
            .captures
            .iter()
            .filter_map(|capture| match &capture.target {
                CaptureTarget::Binding(key) => self
                    .capture_binding(key)
                    .map(|binding| (capture.name.clone(), binding.to_expr())),
                CaptureTarget::Global => None,
            })
            .collect();
        let mut rewritten = node.clone();
        if !map.is_empty() {
            rewritten.body = Rewriter { map: &map }.stmts(&node.body);
        }
        rewritten
    }

    /// Dump scope assignments at debug level
    pub fn log(&self) {
        for (env, name) in &self.scope_names {
            tracing::debug!(env = %env, scope = %name, "scope storage");
        }
    }
}

struct Rewriter<'a> {
    map: &'a FxHashMap<String, Expr>,
}

impl Rewriter<'_> {
    fn function(&self, node: &Rc<FunctionNode>) -> Rc<FunctionNode> {
        let bound = bound_names(node);
        let inner: FxHashMap<String, Expr> = self
            .map
            .iter()
            .filter(|(name, _)| !bound.contains(*name))
            .map(|(name, expr)| (name.clone(), expr.clone()))
            .collect();
        if inner.is_empty() {
            return Rc::clone(node);
        }
        let mut rewritten = FunctionNode::clone(node);
        rewritten.body = Rewriter { map: &inner }.stmts(&node.body);
        Rc::new(rewritten)
    }

    fn stmts(&self, stmts: &[Stmt]) -> Vec<Stmt> {
        stmts.iter().map(|stmt| self.stmt(stmt)).collect()
    }

    fn boxed(&self, stmt: &Stmt) -> Box<Stmt> {
        Box::new(self.stmt(stmt))
    }

    fn stmt(&self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::Var(decl) => Stmt::Var(VarDecl {
                init: decl.init.as_ref().map(|init| self.expr(init)),
                ..decl.clone()
            }),
            Stmt::Function(node) => Stmt::Function(self.function(node)),
            Stmt::If { test, consequent, alternate } => Stmt::If {
                test: self.expr(test),
                consequent: self.boxed(consequent),
                alternate: alternate.as_ref().map(|alternate| self.boxed(alternate)),
            },
            Stmt::While { test, body } => Stmt::While {
                test: self.expr(test),
                body: self.boxed(body),
            },
            Stmt::Block(stmts) => Stmt::Block(self.stmts(stmts)),
            Stmt::Return(value) => Stmt::Return(value.as_ref().map(|value| self.expr(value))),
            Stmt::Throw(value) => Stmt::Throw(self.expr(value)),
            Stmt::Expr(value) => Stmt::Expr(self.expr(value)),
            Stmt::Empty => Stmt::Empty,
        }
    }

    fn boxed_expr(&self, expr: &Expr) -> Box<Expr> {
        Box::new(self.expr(expr))
    }

    fn expr(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Ident(name) => match self.map.get(name) {
                Some(replacement) => replacement.clone(),
                None => expr.clone(),
            },
            Expr::Number(_)
            | Expr::String(_)
            | Expr::Bool(_)
            | Expr::Null
            | Expr::Undefined => expr.clone(),
            Expr::Object(properties) => Expr::Object(
                properties
                    .iter()
                    .map(|(key, value)| (key.clone(), self.expr(value)))
                    .collect(),
            ),
            Expr::Array(elements) => {
                Expr::Array(elements.iter().map(|element| self.expr(element)).collect())
            }
            Expr::Function(node) => Expr::Function(self.function(node)),
            Expr::Member { object, property } => Expr::Member {
                object: self.boxed_expr(object),
                property: property.clone(),
            },
            Expr::Index { object, index } => Expr::Index {
                object: self.boxed_expr(object),
                index: self.boxed_expr(index),
            },
            Expr::Call { callee, args } => Expr::Call {
                callee: self.boxed_expr(callee),
                args: args.iter().map(|arg| self.expr(arg)).collect(),
            },
            Expr::Assign { op, target, value } => Expr::Assign {
                op: *op,
                target: self.boxed_expr(target),
                value: self.boxed_expr(value),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: self.boxed_expr(left),
                right: self.boxed_expr(right),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: self.boxed_expr(operand),
            },
            Expr::Update { op, prefix, target } => Expr::Update {
                op: *op,
                prefix: *prefix,
                target: self.boxed_expr(target),
            },
            Expr::Conditional { test, consequent, alternate } => Expr::Conditional {
                test: self.boxed_expr(test),
                consequent: self.boxed_expr(consequent),
                alternate: self.boxed_expr(alternate),
            },
        }
    }
}
