//! Lexer for the Rill language.
//!
//! Tokenization is driven by the logos library; the logos token enum is
//! converted to [`Token`] with line/column information attached.

use super::token::{Span, Token};
use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    // Comments (skip)
    #[regex(r"#[^\n]*", logos::skip)]
    LineComment,

    // Keywords (must come before identifiers)
    #[token("let")]
    Let,

    #[token("fn")]
    Fn,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("return")]
    Return,

    #[token("raise")]
    Raise,

    #[token("try")]
    Try,

    #[token("catch")]
    Catch,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("nil")]
    Nil,

    #[token("self")]
    SelfKw,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*", parse_float)]
    FloatLiteral(f64),

    #[regex(r"[0-9][0-9_]*", parse_int)]
    IntLiteral(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    StringLiteral(String),

    #[regex(r#""([^"\\\n]|\\.)*"#)]
    UnterminatedString,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("==")]
    EqualEqual,

    #[token("!=")]
    BangEqual,

    #[token("<")]
    Less,

    #[token("<=")]
    LessEqual,

    #[token(">")]
    Greater,

    #[token(">=")]
    GreaterEqual,

    #[token("&&")]
    AmpAmp,

    #[token("||")]
    PipePipe,

    #[token("!")]
    Bang,

    #[token("=")]
    Equal,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,
}

fn parse_int(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<i64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_float(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<'_, LogosToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1]; // Remove quotes
    Some(unescape_string(inner))
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('0') => result.push('\0'),
                Some(c) => result.push(c),
                None => break,
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// Character that starts no token
    UnexpectedCharacter {
        /// The character
        char: char,
        /// Where it was found
        span: Span,
    },
    /// String literal missing its closing quote
    UnterminatedString {
        /// Where the literal starts
        span: Span,
    },
    /// Numeric literal out of range
    InvalidNumber {
        /// Literal text
        text: String,
        /// Where it was found
        span: Span,
    },
}

impl LexError {
    /// Location of the error
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter { char, .. } => {
                write!(f, "unexpected character '{}'", char)
            }
            LexError::UnterminatedString { .. } => write!(f, "unterminated string literal"),
            LexError::InvalidNumber { text, .. } => write!(f, "invalid number '{}'", text),
        }
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the whole input, appending an EOF token.
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut logos_lexer = LogosToken::lexer(self.source);
        let mut line = 1u32;
        let mut column = 1u32;
        let mut last_end = 0;

        while let Some(token_result) = logos_lexer.next() {
            let range = logos_lexer.span();
            advance_position(&self.source[last_end..range.start], &mut line, &mut column);
            let span = Span::new(range.start, range.end, line, column);
            let text = &self.source[range.clone()];

            match token_result {
                Ok(LogosToken::UnterminatedString) => {
                    errors.push(LexError::UnterminatedString { span });
                }
                Ok(logos_token) => tokens.push((convert_token(logos_token), span)),
                Err(_) if text.starts_with(|c: char| c.is_ascii_digit()) => {
                    errors.push(LexError::InvalidNumber {
                        text: text.to_string(),
                        span,
                    });
                }
                Err(_) => {
                    let char = text.chars().next().unwrap_or('\0');
                    errors.push(LexError::UnexpectedCharacter { char, span });
                }
            }

            advance_position(text, &mut line, &mut column);
            last_end = range.end;
        }

        advance_position(&self.source[last_end..], &mut line, &mut column);
        let eof_span = Span::new(self.source.len(), self.source.len(), line, column);
        tokens.push((Token::Eof, eof_span));

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }
}

fn advance_position(text: &str, line: &mut u32, column: &mut u32) {
    for c in text.chars() {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}

fn convert_token(token: LogosToken) -> Token {
    match token {
        LogosToken::Let => Token::Let,
        LogosToken::Fn => Token::Fn,
        LogosToken::If => Token::If,
        LogosToken::Else => Token::Else,
        LogosToken::While => Token::While,
        LogosToken::Return => Token::Return,
        LogosToken::Raise => Token::Raise,
        LogosToken::Try => Token::Try,
        LogosToken::Catch => Token::Catch,
        LogosToken::True => Token::True,
        LogosToken::False => Token::False,
        LogosToken::Nil => Token::Nil,
        LogosToken::SelfKw => Token::SelfKw,
        LogosToken::Identifier(name) => Token::Identifier(name),
        LogosToken::FloatLiteral(x) => Token::FloatLiteral(x),
        LogosToken::IntLiteral(i) => Token::IntLiteral(i),
        LogosToken::StringLiteral(s) => Token::StringLiteral(s),
        LogosToken::Plus => Token::Plus,
        LogosToken::Minus => Token::Minus,
        LogosToken::Star => Token::Star,
        LogosToken::Slash => Token::Slash,
        LogosToken::Percent => Token::Percent,
        LogosToken::EqualEqual => Token::EqualEqual,
        LogosToken::BangEqual => Token::BangEqual,
        LogosToken::Less => Token::Less,
        LogosToken::LessEqual => Token::LessEqual,
        LogosToken::Greater => Token::Greater,
        LogosToken::GreaterEqual => Token::GreaterEqual,
        LogosToken::AmpAmp => Token::AmpAmp,
        LogosToken::PipePipe => Token::PipePipe,
        LogosToken::Bang => Token::Bang,
        LogosToken::Equal => Token::Equal,
        LogosToken::LeftParen => Token::LeftParen,
        LogosToken::RightParen => Token::RightParen,
        LogosToken::LeftBrace => Token::LeftBrace,
        LogosToken::RightBrace => Token::RightBrace,
        LogosToken::Comma => Token::Comma,
        LogosToken::Semicolon => Token::Semicolon,
        // Skipped or handled by the caller
        LogosToken::Whitespace | LogosToken::LineComment | LogosToken::UnterminatedString => {
            Token::Eof
        }
    }
}
