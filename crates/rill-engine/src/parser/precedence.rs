//! Operator precedence table for expression parsing.

use super::ast::BinaryOp;
use super::token::Token;

/// Operator precedence level (higher = tighter binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None = 0,
    LogicalOr = 1,      // ||
    LogicalAnd = 2,     // &&
    Equality = 3,       // ==, !=
    Relational = 4,     // <, >, <=, >=
    Additive = 5,       // +, -
    Multiplicative = 6, // *, /, %
}

impl Precedence {
    /// The next tighter level, used for left-associative operands
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::LogicalOr,
            Precedence::LogicalOr => Precedence::LogicalAnd,
            Precedence::LogicalAnd => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Additive,
            Precedence::Additive | Precedence::Multiplicative => Precedence::Multiplicative,
        }
    }
}

/// Get the precedence and operator of a binary operator token.
pub fn binary_operator(token: &Token) -> Option<(Precedence, BinaryOp)> {
    let entry = match token {
        Token::PipePipe => (Precedence::LogicalOr, BinaryOp::Or),
        Token::AmpAmp => (Precedence::LogicalAnd, BinaryOp::And),
        Token::EqualEqual => (Precedence::Equality, BinaryOp::Eq),
        Token::BangEqual => (Precedence::Equality, BinaryOp::Ne),
        Token::Less => (Precedence::Relational, BinaryOp::Lt),
        Token::LessEqual => (Precedence::Relational, BinaryOp::Le),
        Token::Greater => (Precedence::Relational, BinaryOp::Gt),
        Token::GreaterEqual => (Precedence::Relational, BinaryOp::Ge),
        Token::Plus => (Precedence::Additive, BinaryOp::Add),
        Token::Minus => (Precedence::Additive, BinaryOp::Sub),
        Token::Star => (Precedence::Multiplicative, BinaryOp::Mul),
        Token::Slash => (Precedence::Multiplicative, BinaryOp::Div),
        Token::Percent => (Precedence::Multiplicative, BinaryOp::Mod),
        _ => return None,
    };
    Some(entry)
}
