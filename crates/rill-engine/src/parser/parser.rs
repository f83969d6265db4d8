//! Recursive descent parser
//!
//! Transforms the token stream from the lexer into a [`Program`]. Parsing
//! stops at the first error.

use super::ast::*;
use super::lexer::{LexError, Lexer};
use super::precedence::{binary_operator, Precedence};
use super::token::{Span, Token};
use std::fmt;

/// A parse error with location
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The kind of error that occurred
    pub kind: ParseErrorKind,
    /// Source location of the error
    pub span: Span,
    /// Human-readable error message
    pub message: String,
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Tokenization failed
    Lex(LexError),
    /// Unexpected token found
    UnexpectedToken {
        /// What the parser was looking for
        expected: String,
        /// What it found
        found: Token,
    },
    /// Unexpected end of file
    UnexpectedEof {
        /// What the parser was looking for
        expected: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            span: err.span(),
            message: err.to_string(),
            kind: ParseErrorKind::Lex(err),
        }
    }
}

/// Parse source text into a program
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse()
}

/// Parser state
pub struct Parser {
    /// Pre-tokenized input, terminated by EOF
    tokens: Vec<(Token, Span)>,
    /// Current position in token stream
    pos: usize,
}

impl Parser {
    /// Create a new parser from source code.
    ///
    /// Fails with the first lexical error.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize().map_err(|mut errors| {
            ParseError::from(errors.swap_remove(0))
        })?;
        Ok(Self { tokens, pos: 0 })
    }

    /// Parse the entire source into a program.
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let start = self.current_span();
        let mut statements = Vec::new();
        while !self.at_eof() {
            statements.push(self.parse_statement()?);
        }
        let span = match statements.last() {
            Some(last) => start.to(last.span()),
            None => start,
        };
        Ok(Program { statements, span })
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    #[inline]
    fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    #[inline]
    fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].1
    }

    #[inline]
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(tok, _)| tok)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    #[inline]
    fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(expected)
    }

    #[inline]
    fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn expect(&mut self, expected: Token) -> Result<Span, ParseError> {
        if self.check(&expected) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let span = self.current_span();
        if self.at_eof() {
            ParseError {
                kind: ParseErrorKind::UnexpectedEof {
                    expected: expected.to_string(),
                },
                span,
                message: format!("unexpected end of input, expected {}", expected),
            }
        } else {
            ParseError {
                kind: ParseErrorKind::UnexpectedToken {
                    expected: expected.to_string(),
                    found: self.current().clone(),
                },
                span,
                message: format!("unexpected {}, expected {}", self.current(), expected),
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        match self.current() {
            Token::Let => {
                self.advance();
                let name = self.expect_identifier()?;
                self.expect(Token::Equal)?;
                let value = self.parse_expression()?;
                let end = self.expect(Token::Semicolon)?;
                Ok(Statement::Let {
                    name,
                    value,
                    span: start.to(&end),
                })
            }
            Token::Identifier(_) if self.peek() == Some(&Token::Equal) => {
                let name = self.expect_identifier()?;
                self.advance(); // '='
                let value = self.parse_expression()?;
                let end = self.expect(Token::Semicolon)?;
                Ok(Statement::Assign {
                    name,
                    value,
                    span: start.to(&end),
                })
            }
            Token::Fn => self.parse_function().map(Statement::Function),
            Token::If => self.parse_if(),
            Token::While => {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                let span = start.to(&body.span);
                Ok(Statement::While {
                    condition,
                    body,
                    span,
                })
            }
            Token::Return => {
                self.advance();
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let end = self.expect(Token::Semicolon)?;
                Ok(Statement::Return {
                    value,
                    span: start.to(&end),
                })
            }
            Token::Raise => {
                self.advance();
                let value = self.parse_expression()?;
                let end = self.expect(Token::Semicolon)?;
                Ok(Statement::Raise {
                    value,
                    span: start.to(&end),
                })
            }
            Token::Try => {
                self.advance();
                let body = self.parse_block()?;
                self.expect(Token::Catch)?;
                self.expect(Token::LeftParen)?;
                let binding = self.expect_identifier()?;
                self.expect(Token::RightParen)?;
                let handler = self.parse_block()?;
                let span = start.to(&handler.span);
                Ok(Statement::Try {
                    body,
                    binding,
                    handler,
                    span,
                })
            }
            _ => {
                let expr = self.parse_expression()?;
                // The trailing semicolon may be omitted on the last statement of a block
                let end = if self.check(&Token::RightBrace) || self.at_eof() {
                    self.previous_span()
                } else {
                    self.expect(Token::Semicolon)?
                };
                Ok(Statement::Expression {
                    expr,
                    span: start.to(&end),
                })
            }
        }
    }

    fn parse_function(&mut self) -> Result<FunctionDecl, ParseError> {
        let start = self.expect(Token::Fn)?;
        let name = self.expect_identifier()?;
        self.expect(Token::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(Token::RightParen)?;
        let body = self.parse_block()?;
        let span = start.to(&body.span);
        Ok(FunctionDecl {
            name,
            params,
            body,
            span,
        })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::If)?;
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.check(&Token::Else) {
            self.advance();
            if self.check(&Token::If) {
                let nested = self.parse_if()?;
                let span = *nested.span();
                Some(Block {
                    statements: vec![nested],
                    span,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        let end = else_branch.as_ref().map_or(then_branch.span, |b| b.span);
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            span: start.to(&end),
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.expect(Token::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.check(&Token::RightBrace) {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        let end = self.expect(Token::RightBrace)?;
        Ok(Block {
            statements,
            span: start.to(&end),
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary(Precedence::LogicalOr)
    }

    /// Precedence climbing over left-associative binary operators
    fn parse_binary(&mut self, min: Precedence) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some((prec, op)) = binary_operator(self.current()) {
            if prec < min {
                break;
            }
            self.advance();
            let right = if prec == Precedence::Multiplicative {
                self.parse_unary()?
            } else {
                self.parse_binary(prec.next())?
            };
            let span = left.span().to(right.span());
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let op = match self.current() {
            Token::Minus => UnaryOp::Negate,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span());
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let span = self.current_span();
        let expr = match self.current().clone() {
            Token::IntLiteral(value) => Expression::Int(value, span),
            Token::FloatLiteral(value) => Expression::Float(value, span),
            Token::StringLiteral(value) => Expression::Str(value, span),
            Token::True => Expression::Bool(true, span),
            Token::False => Expression::Bool(false, span),
            Token::Nil => Expression::Nil(span),
            Token::SelfKw => Expression::SelfRef(span),
            Token::Identifier(name) => {
                self.advance();
                if self.check(&Token::LeftParen) {
                    return self.parse_call(name, span);
                }
                return Ok(Expression::Identifier(name, span));
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_call(&mut self, callee: String, start: Span) -> Result<Expression, ParseError> {
        self.expect(Token::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
        }
        let end = self.expect(Token::RightParen)?;
        Ok(Expression::Call {
            callee,
            args,
            span: start.to(&end),
        })
    }
}
