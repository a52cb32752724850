//! Type annotation stripping.

use crate::parser::ast::{Expr, FunctionNode, Program, Stmt};
use std::rc::Rc;

/// Remove every type annotation from `program`.
pub fn strip_type_annotations(program: &mut Program) {
    for stmt in &mut program.body {
        strip_stmt(stmt);
    }
}

fn strip_function(node: &Rc<FunctionNode>) -> Rc<FunctionNode> {
    let mut node = FunctionNode::clone(node);
    for param in &mut node.params {
        param.ty = None;
    }
    node.return_ty = None;
    for stmt in &mut node.body {
        strip_stmt(stmt);
    }
    Rc::new(node)
}

fn strip_stmt(stmt: &mut Stmt) {
    match stmt {
        Stmt::Var(decl) => {
            decl.ty = None;
            if let Some(init) = &mut decl.init {
                strip_expr(init);
            }
        }
        Stmt::Function(node) => *node = strip_function(node),
        Stmt::If { test, consequent, alternate } => {
            strip_expr(test);
            strip_stmt(consequent);
            if let Some(alternate) = alternate {
                strip_stmt(alternate);
            }
        }
        Stmt::While { test, body } => {
            strip_expr(test);
            strip_stmt(body);
        }
        Stmt::Block(stmts) => {
            for stmt in stmts {
                strip_stmt(stmt);
            }
        }
        Stmt::Return(Some(value)) | Stmt::Throw(value) | Stmt::Expr(value) => strip_expr(value),
        Stmt::Return(None) | Stmt::Empty => {}
    }
}

fn strip_expr(expr: &mut Expr) {
    match expr {
        Expr::Function(node) => *node = strip_function(node),
        Expr::Object(props) => {
            for (_, value) in props {
                strip_expr(value);
            }
        }
        Expr::Array(elements) => {
            for element in elements {
                strip_expr(element);
            }
        }
        Expr::Member { object, .. } => strip_expr(object),
        Expr::Index { object, index } => {
            strip_expr(object);
            strip_expr(index);
        }
        Expr::Call { callee, args } => {
            strip_expr(callee);
            for arg in args {
                strip_expr(arg);
            }
        }
        Expr::Assign { target, value, .. } => {
            strip_expr(target);
            strip_expr(value);
        }
        Expr::Binary { left, right, .. } => {
            strip_expr(left);
            strip_expr(right);
        }
        Expr::Unary { operand, .. } => strip_expr(operand),
        Expr::Update { target, .. } => strip_expr(target),
        Expr::Conditional { test, consequent, alternate } => {
            strip_expr(test);
            strip_expr(consequent);
            strip_expr(alternate);
        }
        Expr::Number(_)
        | Expr::String(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Undefined
        | Expr::Ident(_) => {}
    }
}
