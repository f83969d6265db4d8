//! Rill virtual machine
//!
//! This module provides the runtime half of the engine:
//! - Stack-based bytecode interpreter
//! - Object model (classes, methods, exceptions)
//! - Allocation arena
//! - Built-in kernel methods
//! - Dynamic library access for native extensions

pub mod arena;
pub mod builtins;
pub mod callable;
pub mod ffi;
pub mod interpreter;
pub mod object;
pub mod value;

pub use arena::Arena;
pub use callable::Proc;
pub use interpreter::{Loaded, OutputBuffer, Vm};
pub use object::{Class, ClassId, ClassRegistry, Exception, Method, NativeFn, Object};
pub use value::Value;

use crate::compiler::ModuleError;
use std::rc::Rc;
use thiserror::Error;

/// Result of VM execution
pub type VmResult<T> = Result<T, VmError>;

/// Abrupt completion of VM execution
#[derive(Debug, Clone, Error)]
pub enum VmError {
    /// An exception is propagating towards the nearest handler
    #[error("{0}")]
    Raised(Rc<Exception>),

    /// A `STOP` instruction halted the VM
    #[error("VM halted")]
    Halted,
}

impl VmError {
    /// The propagating exception, if any
    pub fn exception(&self) -> Option<&Rc<Exception>> {
        match self {
            VmError::Raised(exc) => Some(exc),
            VmError::Halted => None,
        }
    }
}

/// Outcome of deserializing a unit inside a VM
#[derive(Debug, Error)]
pub enum ReadError {
    /// The data is not a valid unit; no exception was raised
    #[error("{0}")]
    Malformed(#[from] ModuleError),

    /// The reader raised an exception in the VM
    #[error("{0}")]
    Raised(VmError),
}

/// VM configuration
#[derive(Debug, Clone)]
pub struct VmOptions {
    /// Maximum nesting of script method calls
    pub max_call_depth: usize,
    /// Deepest unit nesting accepted when reading bytecode
    pub max_unit_depth: usize,
    /// Longest string constant accepted when reading bytecode
    pub max_string_len: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            max_unit_depth: 64,
            max_string_len: 1 << 20,
        }
    }
}
