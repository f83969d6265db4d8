//! Rill language front end: lexer, AST and parser

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod precedence;
pub mod token;

pub use ast::{BinaryOp, Block, Expression, FunctionDecl, Program, Statement, UnaryOp};
pub use lexer::{LexError, Lexer};
pub use parser::{parse, ParseError, ParseErrorKind, Parser};
pub use token::{Span, Token};
