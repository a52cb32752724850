//! Abstract syntax tree.
//!
//! The same tree serves as parser output, as the interpreter's code
//! representation and as the serializer's output that the printer turns
//! back into text.

use crate::parser::token::Span;
use std::rc::Rc;

/// A whole program (one source unit, or the generated output).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// Top-level statements in order
    pub body: Vec<Stmt>,
}

/// Declaration keyword of a variable statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
}

impl VarKind {
    /// Keyword text
    pub fn keyword(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// A single-name variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// Declaration keyword
    pub kind: VarKind,
    /// Bound name
    pub name: String,
    /// Optional type annotation
    pub ty: Option<String>,
    /// Initializer
    pub init: Option<Expr>,
}

/// Function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Optional type annotation
    pub ty: Option<String>,
}

/// A function declaration or expression.
///
/// Shared through `Rc` so that every closure created from the same syntax
/// points at one node.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    /// Function name, if any
    pub name: Option<String>,
    /// Parameters
    pub params: Vec<Param>,
    /// Optional return type annotation
    pub return_ty: Option<String>,
    /// Body statements
    pub body: Vec<Stmt>,
    /// True for `function f() {}` in statement position.
    ///
    /// A declaration binds its name in the enclosing scope; an expression
    /// binds it in its own scope.
    pub is_declaration: bool,
    /// Index of the source unit this function came from
    pub unit: usize,
    /// Location in that unit
    pub span: Span,
}

impl FunctionNode {
    /// Human-readable name for diagnostics
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var x = e;`
    Var(VarDecl),
    /// `function f() {}`
    Function(Rc<FunctionNode>),
    /// `if (test) consequent else alternate`
    If {
        /// Condition
        test: Expr,
        /// Then branch
        consequent: Box<Stmt>,
        /// Else branch
        alternate: Option<Box<Stmt>>,
    },
    /// `while (test) body`
    While {
        /// Condition
        test: Expr,
        /// Loop body
        body: Box<Stmt>,
    },
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `return e;`
    Return(Option<Expr>),
    /// `throw e;`
    Throw(Expr),
    /// Expression statement
    Expr(Expr),
    /// `;`
    Empty,
}

/// Binary operators (including the short-circuiting logical ones).
///
/// Variants are named after the operator; [`BinaryOp::symbol`] gives the
/// text.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Operator text
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::StrictEqual => "===",
            BinaryOp::StrictNotEqual => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::StrictEqual | BinaryOp::StrictNotEqual => 5,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => 6,
            BinaryOp::Add | BinaryOp::Sub => 7,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 8,
        }
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `typeof`
    Typeof,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
}

impl AssignOp {
    /// Operator text
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
        }
    }
}

/// `++` / `--`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// String literal, unescaped
    String(String),
    /// `true` / `false`
    Bool(bool),
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Identifier reference
    Ident(String),
    /// `{ key: value, ... }` with keys in source order
    Object(Vec<(String, Expr)>),
    /// `[a, b, ...]`
    Array(Vec<Expr>),
    /// Function expression
    Function(Rc<FunctionNode>),
    /// `object.property`
    Member {
        /// Receiver
        object: Box<Expr>,
        /// Property name
        property: String,
    },
    /// `object[index]`
    Index {
        /// Receiver
        object: Box<Expr>,
        /// Computed key
        index: Box<Expr>,
    },
    /// `callee(args)`
    Call {
        /// Called expression
        callee: Box<Expr>,
        /// Arguments in order
        args: Vec<Expr>,
    },
    /// `target op value`
    Assign {
        /// `=`, `+=` or `-=`
        op: AssignOp,
        /// Identifier, member or index expression
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `left op right`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// `op operand`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// `++x`, `x--` and friends
    Update {
        /// Increment or decrement
        op: UpdateOp,
        /// Operator written before the target
        prefix: bool,
        /// Identifier, member or index expression
        target: Box<Expr>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        /// Condition
        test: Box<Expr>,
        /// Value when truthy
        consequent: Box<Expr>,
        /// Value when falsy
        alternate: Box<Expr>,
    },
}

impl Expr {
    /// Identifier expression
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    /// `object.property`, or `object["property"]` when the key is not an identifier
    pub fn member(object: Expr, property: &str) -> Self {
        if is_identifier_name(property) {
            Expr::Member { object: Box::new(object), property: property.to_string() }
        } else {
            Expr::Index {
                object: Box::new(object),
                index: Box::new(Expr::String(property.to_string())),
            }
        }
    }

    /// `object[index]` with a numeric index
    pub fn element(object: Expr, index: usize) -> Self {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(Expr::Number(index as f64)),
        }
    }

    /// `target = value`
    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: AssignOp::Assign,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// `callee(args)`
    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call { callee: Box::new(callee), args }
    }

    /// True for expressions that can be assigned to
    pub fn is_assignment_target(&self) -> bool {
        matches!(self, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. })
    }
}

impl Stmt {
    /// `var name = init;`
    pub fn var(name: impl Into<String>, init: Expr) -> Self {
        Stmt::Var(VarDecl {
            kind: VarKind::Var,
            name: name.into(),
            ty: None,
            init: Some(init),
        })
    }
}

const RESERVED_WORDS: &[&str] = &[
    "var", "let", "const", "function", "return", "if", "else", "while", "throw", "typeof",
    "true", "false", "null",
];

/// True when `name` can be written as a bare identifier / property name.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$');
    valid_start
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}
