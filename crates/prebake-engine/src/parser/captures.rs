//! Closure capture analysis
//!
//! Computes which outer variables a function reads or writes: its free
//! variables, minus parameters, hoisted locals and (for named function
//! expressions) its own name. Nested functions are analyzed recursively
//! and their free variables bubble up unless the enclosing function binds
//! them.

use crate::parser::ast::{Expr, FunctionNode, Stmt};
use crate::parser::token::Span;
use rustc_hash::{FxHashMap, FxHashSet};

/// Information about a single captured variable
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInfo {
    /// Name of the captured variable
    pub name: String,
    /// Whether the function (or a nested one) assigns to it
    pub is_mutated: bool,
    /// Span of the function where the capture was first seen
    pub capture_span: Span,
}

/// All captures for a single function, in first-reference order
#[derive(Debug, Clone, Default)]
pub struct FunctionCaptures {
    /// Captured variables in capture order
    pub captures: Vec<CaptureInfo>,
    /// Quick lookup by variable name
    capture_indices: FxHashMap<String, usize>,
}

impl FunctionCaptures {
    /// Create a new empty capture set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capture, merging the mutation flag into an existing entry
    pub fn add(&mut self, info: CaptureInfo) {
        match self.capture_indices.get(&info.name) {
            Some(&idx) => self.captures[idx].is_mutated |= info.is_mutated,
            None => {
                self.capture_indices.insert(info.name.clone(), self.captures.len());
                self.captures.push(info);
            }
        }
    }

    /// Check if a variable is captured
    pub fn is_captured(&self, name: &str) -> bool {
        self.capture_indices.contains_key(name)
    }

    /// Get capture info by name
    pub fn get(&self, name: &str) -> Option<&CaptureInfo> {
        self.capture_indices.get(name).map(|&idx| &self.captures[idx])
    }

    /// Get number of captures
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// Check if there are no captures
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Captured names in first-reference order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|c| c.name.as_str())
    }
}

/// Names a function body declares at function level: `var`/`let`/`const`
/// declarations anywhere in its statements (not inside nested functions)
/// and function declarations.
pub fn hoisted_names(body: &[Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = FxHashSet::default();
    collect_hoisted(body, &mut names, &mut seen);
    names
}

fn collect_hoisted(body: &[Stmt], names: &mut Vec<String>, seen: &mut FxHashSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Var(decl) => {
                if seen.insert(decl.name.clone()) {
                    names.push(decl.name.clone());
                }
            }
            Stmt::Function(node) => {
                if let Some(name) = &node.name {
                    if seen.insert(name.clone()) {
                        names.push(name.clone());
                    }
                }
            }
            Stmt::If { consequent, alternate, .. } => {
                collect_hoisted(std::slice::from_ref(consequent.as_ref()), names, seen);
                if let Some(alternate) = alternate {
                    collect_hoisted(std::slice::from_ref(alternate.as_ref()), names, seen);
                }
            }
            Stmt::While { body, .. } => {
                collect_hoisted(std::slice::from_ref(body.as_ref()), names, seen);
            }
            Stmt::Block(stmts) => collect_hoisted(stmts, names, seen),
            Stmt::Return(_) | Stmt::Throw(_) | Stmt::Expr(_) | Stmt::Empty => {}
        }
    }
}

/// Names bound inside a function's own scope.
pub fn bound_names(node: &FunctionNode) -> FxHashSet<String> {
    let mut bound: FxHashSet<String> = node.params.iter().map(|p| p.name.clone()).collect();
    bound.extend(hoisted_names(&node.body));
    if !node.is_declaration {
        if let Some(name) = &node.name {
            bound.insert(name.clone());
        }
    }
    bound
}

/// Analyze the free variables of `node`.
pub fn analyze_function(node: &FunctionNode) -> FunctionCaptures {
    let mut collector = FreeVariableCollector::new(bound_names(node), node.span);
    collector.stmts(&node.body);
    collector.captures
}

/// Helper for collecting free variables during AST traversal
#[derive(Debug)]
struct FreeVariableCollector {
    /// Variables bound in the function being analyzed
    bound_vars: FxHashSet<String>,
    captures: FunctionCaptures,
    span: Span,
}

impl FreeVariableCollector {
    fn new(bound_vars: FxHashSet<String>, span: Span) -> Self {
        Self {
            bound_vars,
            captures: FunctionCaptures::new(),
            span,
        }
    }

    fn reference(&mut self, name: &str, is_mutated: bool) {
        if !self.bound_vars.contains(name) {
            self.captures.add(CaptureInfo {
                name: name.to_string(),
                is_mutated,
                capture_span: self.span,
            });
        }
    }

    fn nested(&mut self, node: &FunctionNode) {
        for capture in analyze_function(node).captures {
            self.reference(&capture.name, capture.is_mutated);
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => {
                if let Some(init) = &decl.init {
                    self.expr(init);
                }
            }
            Stmt::Function(node) => self.nested(node),
            Stmt::If { test, consequent, alternate } => {
                self.expr(test);
                self.stmt(consequent);
                if let Some(alternate) = alternate {
                    self.stmt(alternate);
                }
            }
            Stmt::While { test, body } => {
                self.expr(test);
                self.stmt(body);
            }
            Stmt::Block(stmts) => self.stmts(stmts),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::Throw(value) | Stmt::Expr(value) => self.expr(value),
            Stmt::Empty => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(_) | Expr::String(_) | Expr::Bool(_) | Expr::Null | Expr::Undefined => {}
            Expr::Ident(name) => self.reference(name, false),
            Expr::Object(props) => {
                for (_, value) in props {
                    self.expr(value);
                }
            }
            Expr::Array(elements) => {
                for element in elements {
                    self.expr(element);
                }
            }
            Expr::Function(node) => self.nested(node),
            Expr::Member { object, .. } => self.expr(object),
            Expr::Index { object, index } => {
                self.expr(object);
                self.expr(index);
            }
            Expr::Call { callee, args } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::Assign { target, value, .. } => {
                self.target(target);
                self.expr(value);
            }
            Expr::Update { target, .. } => self.target(target),
            Expr::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Conditional { test, consequent, alternate } => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
            }
        }
    }

    fn target(&mut self, target: &Expr) {
        match target {
            Expr::Ident(name) => self.reference(name, true),
            other => self.expr(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Stmt;
    use crate::parser::parser::parse_source;

    fn first_function(source: &str) -> std::rc::Rc<FunctionNode> {
        match parse_source(source, 0).unwrap().program.body.remove(0) {
            Stmt::Function(node) => node,
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_params_and_locals_are_not_captured() {
        let node = first_function("function f(a) { var b = a; return b + c; }");
        let captures = analyze_function(&node);
        assert_eq!(captures.names().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_capture_order_and_mutation() {
        let node = first_function("function f() { y = x; x++; return z; }");
        let captures = analyze_function(&node);
        assert_eq!(captures.names().collect::<Vec<_>>(), vec!["y", "x", "z"]);
        assert!(captures.get("y").unwrap().is_mutated);
        assert!(captures.get("x").unwrap().is_mutated);
        assert!(!captures.get("z").unwrap().is_mutated);
    }

    #[test]
    fn test_nested_function_captures_bubble_up() {
        let node = first_function(
            "function outer() { var local = 1; return function () { return local + shared; }; }",
        );
        let captures = analyze_function(&node);
        assert_eq!(captures.names().collect::<Vec<_>>(), vec!["shared"]);
    }

    #[test]
    fn test_hoisted_names_skip_nested_functions() {
        let node = first_function(
            "function f() { if (a) { var x = 1; } function g() { var hidden; } while (b) var y; }",
        );
        assert_eq!(hoisted_names(&node.body), vec!["x", "g", "y"]);
    }

    #[test]
    fn test_named_expression_binds_own_name() {
        let program = parse_source("var f = function fact(n) { return fact(n - 1); };", 0)
            .unwrap()
            .program;
        let node = match &program.body[0] {
            Stmt::Var(decl) => match &decl.init {
                Some(Expr::Function(node)) => node.clone(),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        };
        assert!(analyze_function(&node).is_empty());
    }
}
