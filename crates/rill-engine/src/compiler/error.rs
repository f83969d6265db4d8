//! Compilation errors

use crate::parser::ParseError;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{file}:{error}")]
    Parse { file: String, error: ParseError },

    #[error("Too many local variables (max 65535)")]
    TooManyLocals,

    #[error("Too many constants (max 65535)")]
    TooManyConstants,

    #[error("Too many symbols (max 65535)")]
    TooManySymbols,

    #[error("Too many parameters (max 255)")]
    TooManyParameters,

    #[error("Too many arguments in call to {name} (max 255)")]
    TooManyArguments { name: String },

    #[error("Too many nested functions (max 65535)")]
    TooManyFunctions,

    #[error("Duplicate parameter {name} in {function}")]
    DuplicateParameter { name: String, function: String },
}

impl CompileError {
    /// Source line the error points at, when known
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Parse { error, .. } => Some(error.span.line),
            _ => None,
        }
    }
}
