//! Recursive-descent parser.
//!
//! Statements are parsed top-down; expressions use precedence climbing
//! over `BinaryOp::precedence`.

use crate::parser::ast::{
    AssignOp, BinaryOp, Expr, FunctionNode, Param, Program, Stmt, UnaryOp, UpdateOp, VarDecl,
    VarKind,
};
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::token::{Span, Token};
use rustc_hash::FxHashSet;
use std::rc::Rc;
use thiserror::Error;

/// A syntax error with its location.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} (line {}:{})", span.line, span.column)]
pub struct ParseError {
    /// Description of the problem
    pub message: String,
    /// Where it was detected
    pub span: Span,
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        ParseError {
            message: error.to_string(),
            span: error.span(),
        }
    }
}

/// Result of parsing one source unit.
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    /// The syntax tree
    pub program: Program,
    /// Every identifier token that appeared in the unit
    pub identifiers: FxHashSet<String>,
}

type ParseResult<T> = Result<T, ParseError>;

/// Parser over a token stream.
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    unit: usize,
}

impl Parser {
    /// Tokenize `source` and prepare to parse it as unit number `unit`.
    pub fn new(source: &str, unit: usize) -> ParseResult<Self> {
        let tokens = Lexer::new(source).tokenize().map_err(|mut errors| {
            // Report the first lexical error; the rest are usually cascades
            ParseError::from(errors.remove(0))
        })?;
        Ok(Self { tokens, pos: 0, unit })
    }

    /// Parse the whole token stream.
    pub fn parse(mut self) -> ParseResult<ParsedUnit> {
        let identifiers = self
            .tokens
            .iter()
            .filter_map(|(token, _)| match token {
                Token::Identifier(name) => Some(name.clone()),
                _ => None,
            })
            .collect();

        let mut body = Vec::new();
        while !self.check(&Token::Eof) {
            body.push(self.parse_statement()?);
        }

        Ok(ParsedUnit {
            program: Program { body },
            identifiers,
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Token::Var | Token::Let | Token::Const => self.parse_var_decl(),
            Token::Function => {
                let function = self.parse_function(true)?;
                Ok(Stmt::Function(function))
            }
            Token::If => self.parse_if(),
            Token::While => {
                self.advance();
                self.expect(Token::LeftParen)?;
                let test = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                let body = self.parse_statement()?;
                Ok(Stmt::While { test, body: Box::new(body) })
            }
            Token::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            Token::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon();
                Ok(Stmt::Return(value))
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.consume_semicolon();
                Ok(Stmt::Throw(value))
            }
            Token::Semicolon => {
                self.advance();
                Ok(Stmt::Empty)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon();
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<Stmt> {
        let kind = match self.advance() {
            Token::Let => VarKind::Let,
            Token::Const => VarKind::Const,
            _ => VarKind::Var,
        };
        let name = self.expect_identifier()?;
        let ty = self.parse_type_annotation()?;
        let init = if self.eat(&Token::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_semicolon();
        Ok(Stmt::Var(VarDecl { kind, name, ty, init }))
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.expect(Token::If)?;
        self.expect(Token::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If { test, consequent, alternate })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(Token::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&Token::RightBrace) {
            if self.check(&Token::Eof) {
                return Err(self.error("Unterminated block"));
            }
            body.push(self.parse_statement()?);
        }
        self.expect(Token::RightBrace)?;
        Ok(body)
    }

    fn parse_function(&mut self, is_declaration: bool) -> ParseResult<Rc<FunctionNode>> {
        let span = self.current_span();
        self.expect(Token::Function)?;

        let name = if let Token::Identifier(_) = self.peek() {
            Some(self.expect_identifier()?)
        } else if is_declaration {
            return Err(self.error("Function declarations require a name"));
        } else {
            None
        };

        self.expect(Token::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(&Token::RightParen) {
            let name = self.expect_identifier()?;
            let ty = self.parse_type_annotation()?;
            params.push(Param { name, ty });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RightParen)?;
        let return_ty = self.parse_type_annotation()?;
        let body = self.parse_block()?;

        Ok(Rc::new(FunctionNode {
            name,
            params,
            return_ty,
            body,
            is_declaration,
            unit: self.unit,
            span,
        }))
    }

    /// `: Name` or `: Name[]`, kept verbatim so it can be printed back.
    fn parse_type_annotation(&mut self) -> ParseResult<Option<String>> {
        if !self.eat(&Token::Colon) {
            return Ok(None);
        }
        let mut ty = match self.advance() {
            Token::Identifier(name) => name,
            Token::Null => "null".to_string(),
            other => return Err(self.error(&format!("Expected type, found {}", other))),
        };
        while self.check(&Token::LeftBracket) {
            self.advance();
            self.expect(Token::RightBracket)?;
            ty.push_str("[]");
        }
        Ok(Some(ty))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parse a full expression (assignment level).
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        let target = self.parse_conditional()?;

        let op = match self.peek() {
            Token::Equal => AssignOp::Assign,
            Token::PlusEqual => AssignOp::AddAssign,
            Token::MinusEqual => AssignOp::SubAssign,
            _ => return Ok(target),
        };
        if !target.is_assignment_target() {
            return Err(self.error("Invalid assignment target"));
        }
        self.advance();
        let value = self.parse_expression()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_binary(BinaryOp::Or.precedence())?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.parse_expression()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(op) = binary_op(self.peek()) {
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(op.precedence() + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            Token::Typeof => UnaryOp::Typeof,
            Token::PlusPlus | Token::MinusMinus => {
                let op = if self.advance() == Token::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                let target = self.parse_unary()?;
                if !target.is_assignment_target() {
                    return Err(self.error("Invalid update target"));
                }
                return Ok(Expr::Update { op, prefix: true, target: Box::new(target) });
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;

        // Fold negative literals so they print back unchanged
        if let (UnaryOp::Neg, Expr::Number(n)) = (op, &operand) {
            return Ok(Expr::Number(-n));
        }
        Ok(Expr::Unary { op, operand: Box::new(operand) })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_call_member()?;
        let op = match self.peek() {
            Token::PlusPlus => UpdateOp::Increment,
            Token::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        if !expr.is_assignment_target() {
            return Err(self.error("Invalid update target"));
        }
        self.advance();
        Ok(Expr::Update { op, prefix: false, target: Box::new(expr) })
    }

    fn parse_call_member(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let property = self.expect_property_name()?;
                    expr = Expr::Member { object: Box::new(expr), property };
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(Token::RightBracket)?;
                    expr = Expr::Index { object: Box::new(expr), index: Box::new(index) };
                }
                Token::LeftParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(&Token::RightParen) {
                        args.push(self.parse_expression()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(Token::RightParen)?;
                    expr = Expr::Call { callee: Box::new(expr), args };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            Token::Function => Ok(Expr::Function(self.parse_function(false)?)),
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&Token::RightBracket) {
                    elements.push(self.parse_expression()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RightBracket)?;
                Ok(Expr::Array(elements))
            }
            Token::LeftBrace => self.parse_object_literal(),
            other => Err(self.error(&format!("Unexpected {}", other))),
        }
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        self.expect(Token::LeftBrace)?;
        let mut properties = Vec::new();

        while !self.check(&Token::RightBrace) {
            let (key, shorthand) = match self.advance() {
                Token::Identifier(name) => (name, true),
                Token::String(s) => (s, false),
                Token::Number(n) => (crate::interpreter::value::number_to_string(n), false),
                other => return Err(self.error(&format!("Expected property name, found {}", other))),
            };
            let value = if self.eat(&Token::Colon) {
                self.parse_expression()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.error("Expected ':' after property name"));
            };
            properties.push((key, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        self.expect(Token::RightBrace)?;
        Ok(Expr::Object(properties))
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {}, found {}", token, self.peek())))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.peek().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(&format!("Expected identifier, found {}", other))),
        }
    }

    /// Property names after `.` may be keywords.
    fn expect_property_name(&mut self) -> ParseResult<String> {
        let name = match self.peek() {
            Token::Identifier(name) => name.clone(),
            keyword @ (Token::Var
            | Token::Let
            | Token::Const
            | Token::Function
            | Token::Return
            | Token::If
            | Token::Else
            | Token::While
            | Token::Throw
            | Token::Typeof
            | Token::True
            | Token::False
            | Token::Null) => keyword.to_string().trim_matches('`').to_string(),
            other => return Err(self.error(&format!("Expected property name, found {}", other))),
        };
        self.advance();
        Ok(name)
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Token::Semicolon | Token::RightBrace | Token::Eof)
    }

    fn consume_semicolon(&mut self) {
        self.eat(&Token::Semicolon);
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            span: self.current_span(),
        }
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Mod,
        Token::Less => BinaryOp::Less,
        Token::Greater => BinaryOp::Greater,
        Token::LessEqual => BinaryOp::LessEqual,
        Token::GreaterEqual => BinaryOp::GreaterEqual,
        Token::EqualEqual => BinaryOp::Equal,
        Token::BangEqual => BinaryOp::NotEqual,
        Token::EqualEqualEqual => BinaryOp::StrictEqual,
        Token::BangEqualEqual => BinaryOp::StrictNotEqual,
        Token::AmpAmp => BinaryOp::And,
        Token::PipePipe => BinaryOp::Or,
        _ => return None,
    })
}

/// Parse `source` as source unit number `unit`.
pub fn parse_source(source: &str, unit: usize) -> ParseResult<ParsedUnit> {
    Parser::new(source, unit)?.parse()
}
