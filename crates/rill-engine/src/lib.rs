//! Rill Language Engine
//!
//! This crate provides the embeddable Rill scripting engine:
//! - **Parser**: Lexer, AST and recursive descent parser (`parser` module)
//! - **Compiler**: Code generation and the binary bytecode unit format (`compiler` module)
//! - **VM**: Interpreter, object model, allocation arena and dynamic linking (`vm` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use rill_engine::{CompileContext, Vm};
//!
//! let mut vm = Vm::new();
//! let unit = vm.compile_source("fn twice(x) { x * 2 } twice(21)", &CompileContext::new())?;
//! let bytes = unit.encode();
//! let unit = vm.read_unit(&mut bytes.as_slice())?;
//! assert_eq!(vm.run(unit)?, Value::Int(42));
//! ```

#![warn(rust_2018_idioms)]
#![allow(clippy::new_without_default)]

/// Parser module: lexer, AST and parser
pub mod parser;

/// Compiler module: code generation and bytecode format
pub mod compiler;

/// VM module: interpreter and runtime support
pub mod vm;

pub use compiler::{compile, CompileContext, CompileError, ModuleError, Unit};
pub use parser::{parse, ParseError};
pub use vm::{
    ffi::{LinkError, Library},
    ClassId, Exception, Loaded, OutputBuffer, Proc, ReadError, Value, Vm, VmError, VmOptions,
    VmResult,
};
