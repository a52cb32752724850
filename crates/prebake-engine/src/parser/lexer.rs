//! Lexer for the source language.
//!
//! Thin driver around the logos-generated `Token` lexer that attaches
//! line/column information to every token and appends an `Eof` marker.

use crate::parser::token::{Span, Token};
use logos::Logos;
use std::fmt;

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// A character that starts no token
    UnexpectedCharacter {
        /// The offending character
        char: char,
        /// Where it was found
        span: Span,
    },
}

impl LexError {
    /// Location of the error
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. } => *span,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter { char, span } => write!(
                f,
                "Unexpected character '{}' at {}:{}",
                char, span.line, span.column
            ),
        }
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, line_starts }
    }

    /// Tokenize the whole source, returning every error found.
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut lexer = Token::lexer(self.source);

        while let Some(result) = lexer.next() {
            let range = lexer.span();
            let span = self.span(range.start, range.end);
            match result {
                Ok(token) => tokens.push((token, span)),
                Err(()) => {
                    let char = self.source[range.start..].chars().next().unwrap_or('\0');
                    errors.push(LexError::UnexpectedCharacter { char, span });
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let end = self.source.len();
        tokens.push((Token::Eof, self.span(end, end)));
        Ok(tokens)
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let line_index = match self.line_starts.binary_search(&start) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let column = start - self.line_starts[line_index] + 1;
        Span::new(start, end, line_index as u32 + 1, column as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_lex_declaration() {
        assert_eq!(
            kinds("var x = 1.5;"),
            vec![
                Token::Var,
                Token::Identifier("x".into()),
                Token::Equal,
                Token::Number(1.5),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_skips_comments() {
        assert_eq!(
            kinds("// line\n/* block\n comment */ x"),
            vec![Token::Identifier("x".into()), Token::Eof]
        );
    }

    #[test]
    fn test_lex_longest_operator() {
        assert_eq!(
            kinds("a !== b"),
            vec![
                Token::Identifier("a".into()),
                Token::BangEqualEqual,
                Token::Identifier("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_line_numbers() {
        let tokens = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!(tokens[1].1.line, 2);
        assert_eq!(tokens[1].1.column, 3);
    }

    #[test]
    fn test_lex_unexpected_character() {
        let errors = Lexer::new("var #").tokenize().unwrap_err();
        assert!(matches!(errors[0], LexError::UnexpectedCharacter { char: '#', .. }));
    }
}
