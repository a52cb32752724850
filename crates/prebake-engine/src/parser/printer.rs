//! Text emitter.
//!
//! Turns a `Program` back into source text with two-space indentation,
//! inserting parentheses only where operator precedence requires them.
//! Optionally records a source map entry for every printed function.

use crate::interpreter::value::number_to_string;
use crate::parser::ast::{
    is_identifier_name, Expr, FunctionNode, Program, Stmt, UnaryOp, UpdateOp, VarDecl,
};
use crate::parser::source_map::{Mapping, Position, SourceMap};

// Expression precedence levels (higher binds tighter)
const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_LOGICAL_OR: u8 = 3;
const PREC_UNARY: u8 = 9;
const PREC_POSTFIX: u8 = 10;
const PREC_CALL: u8 = 11;
const PREC_PRIMARY: u8 = 12;

/// Printer state.
pub struct Printer {
    out: String,
    indent: usize,
    line: u32,
    line_start: usize,
    source_map: Option<SourceMap>,
}

impl Printer {
    /// Create a printer; pass `Some(sources)` to collect a source map.
    pub fn new(sources: Option<Vec<String>>) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            line: 1,
            line_start: 0,
            source_map: sources.map(SourceMap::new),
        }
    }

    /// Print a whole program, returning the text and the optional map.
    pub fn print(mut self, program: &Program) -> (String, Option<SourceMap>) {
        for stmt in &program.body {
            self.stmt(stmt);
        }
        (self.out, self.source_map)
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.line += 1;
        self.line_start = self.out.len();
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn column(&self) -> u32 {
        (self.out.len() - self.line_start) as u32 + 1
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmt(&mut self, stmt: &Stmt) {
        self.write_indent();
        self.stmt_inline(stmt);
        self.newline();
    }

    fn stmt_inline(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => {
                self.var_decl(decl);
                self.write(";");
            }
            Stmt::Function(node) => self.function(node),
            Stmt::If { test, consequent, alternate } => {
                self.write("if (");
                self.expr(test, PREC_ASSIGN);
                self.write(") ");
                self.nested_stmt(consequent);
                if let Some(alternate) = alternate {
                    self.write(" else ");
                    self.nested_stmt(alternate);
                }
            }
            Stmt::While { test, body } => {
                self.write("while (");
                self.expr(test, PREC_ASSIGN);
                self.write(") ");
                self.nested_stmt(body);
            }
            Stmt::Block(stmts) => self.block(stmts),
            Stmt::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.expr(value, PREC_ASSIGN);
                }
                self.write(";");
            }
            Stmt::Throw(value) => {
                self.write("throw ");
                self.expr(value, PREC_ASSIGN);
                self.write(";");
            }
            Stmt::Expr(expr) => {
                if starts_ambiguously(expr) {
                    self.write("(");
                    self.expr(expr, PREC_ASSIGN);
                    self.write(")");
                } else {
                    self.expr(expr, PREC_ASSIGN);
                }
                self.write(";");
            }
            Stmt::Empty => self.write(";"),
        }
    }

    /// Branch and loop bodies: blocks stay on the same line, other
    /// statements are wrapped in a block.
    fn nested_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => self.block(stmts),
            other => self.block(std::slice::from_ref(other)),
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        if stmts.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.newline();
        self.indent += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        self.write(decl.kind.keyword());
        self.write(" ");
        self.write(&decl.name);
        if let Some(ty) = &decl.ty {
            self.write(": ");
            self.write(ty);
        }
        if let Some(init) = &decl.init {
            self.write(" = ");
            self.expr(init, PREC_ASSIGN);
        }
    }

    fn function(&mut self, node: &FunctionNode) {
        let column = self.column();
        if let Some(map) = self.source_map.as_mut() {
            map.add(Mapping {
                generated: Position { line: self.line, column },
                source: node.unit,
                original: Position { line: node.span.line, column: node.span.column },
                name: node.name.clone(),
            });
        }

        self.write("function");
        if let Some(name) = &node.name {
            self.write(" ");
            self.write(name);
        } else {
            self.write(" ");
        }
        self.write("(");
        for (i, param) in node.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&param.name);
            if let Some(ty) = &param.ty {
                self.write(": ");
                self.write(ty);
            }
        }
        self.write(")");
        if let Some(ty) = &node.return_ty {
            self.write(": ");
            self.write(ty);
        }
        self.write(" ");
        self.block(&node.body);
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: &Expr, min_precedence: u8) {
        let precedence = precedence(expr);
        let wrap = precedence < min_precedence;
        if wrap {
            self.write("(");
        }
        self.expr_unwrapped(expr);
        if wrap {
            self.write(")");
        }
    }

    fn expr_unwrapped(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(n) => self.write(&number_to_string(*n)),
            Expr::String(s) => self.write(&quote(s)),
            Expr::Bool(b) => self.write(if *b { "true" } else { "false" }),
            Expr::Null => self.write("null"),
            Expr::Undefined => self.write("undefined"),
            Expr::Ident(name) => self.write(name),
            Expr::Object(props) => {
                if props.is_empty() {
                    self.write("{}");
                    return;
                }
                self.write("{ ");
                for (i, (key, value)) in props.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if is_identifier_name(key) {
                        self.write(key);
                    } else {
                        self.write(&quote(key));
                    }
                    self.write(": ");
                    self.expr(value, PREC_ASSIGN);
                }
                self.write(" }");
            }
            Expr::Array(elements) => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expr(element, PREC_ASSIGN);
                }
                self.write("]");
            }
            Expr::Function(node) => self.function(node),
            Expr::Member { object, property } => {
                self.expr(object, PREC_CALL);
                self.write(".");
                self.write(property);
            }
            Expr::Index { object, index } => {
                self.expr(object, PREC_CALL);
                self.write("[");
                self.expr(index, PREC_ASSIGN);
                self.write("]");
            }
            Expr::Call { callee, args } => {
                self.expr(callee, PREC_CALL);
                self.write("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expr(arg, PREC_ASSIGN);
                }
                self.write(")");
            }
            Expr::Assign { op, target, value } => {
                self.expr(target, PREC_CALL);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.expr(value, PREC_ASSIGN);
            }
            Expr::Binary { op, left, right } => {
                let precedence = op.precedence();
                self.expr(left, precedence);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.expr(right, precedence + 1);
            }
            Expr::Unary { op, operand } => {
                self.write(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::Typeof => "typeof ",
                });
                // `- -x` must not print as `--x`
                let min = if *op == UnaryOp::Neg && starts_with_minus(operand) {
                    PREC_UNARY + 1
                } else {
                    PREC_UNARY
                };
                self.expr(operand, min);
            }
            Expr::Update { op, prefix, target } => {
                let symbol = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                if *prefix {
                    self.write(symbol);
                    self.expr(target, PREC_CALL);
                } else {
                    self.expr(target, PREC_CALL);
                    self.write(symbol);
                }
            }
            Expr::Conditional { test, consequent, alternate } => {
                self.expr(test, PREC_LOGICAL_OR);
                self.write(" ? ");
                self.expr(consequent, PREC_ASSIGN);
                self.write(" : ");
                self.expr(alternate, PREC_ASSIGN);
            }
        }
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(n) if *n < 0.0 || (*n == 0.0 && n.is_sign_negative()) => PREC_UNARY,
        Expr::Assign { .. } => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } => PREC_UNARY,
        Expr::Update { prefix: true, .. } => PREC_UNARY,
        Expr::Update { prefix: false, .. } => PREC_POSTFIX,
        Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

/// True when an expression statement would be misread as a declaration
/// or a block.
fn starts_ambiguously(expr: &Expr) -> bool {
    match expr {
        Expr::Function(_) | Expr::Object(_) => true,
        Expr::Member { object, .. } | Expr::Index { object, .. } => starts_ambiguously(object),
        Expr::Call { callee, .. } => starts_ambiguously(callee),
        Expr::Assign { target, .. } => starts_ambiguously(target),
        Expr::Binary { left, .. } => starts_ambiguously(left),
        Expr::Update { prefix: false, target, .. } => starts_ambiguously(target),
        Expr::Conditional { test, .. } => starts_ambiguously(test),
        _ => false,
    }
}

fn starts_with_minus(expr: &Expr) -> bool {
    match expr {
        Expr::Number(n) => n.is_sign_negative(),
        Expr::Unary { op: UnaryOp::Neg, .. } => true,
        Expr::Update { prefix: true, op: UpdateOp::Decrement, .. } => true,
        _ => false,
    }
}

fn quote(s: &str) -> String {
    // serde_json escaping is a valid string literal in the source language
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// Print a program without a source map.
pub fn print_program(program: &Program) -> String {
    Printer::new(None).print(program).0
}
