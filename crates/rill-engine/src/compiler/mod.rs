//! Rill compiler: AST to bytecode units

pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod unit_builder;

pub use bytecode::{
    verify_unit, BytecodeReader, BytecodeWriter, ConstantPool, DebugInfo, DecodeError,
    ModuleError, Opcode, Unit, VerifyError,
};
pub use codegen::CodeGenerator;
pub use error::{CompileError, CompileResult};
pub use unit_builder::UnitBuilder;

use tracing::debug;

/// Options for one compilation
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    /// Path label used in diagnostics and debug info
    pub filename: Option<String>,
    /// Compile only; the caller gets the unit back instead of running it
    pub no_exec: bool,
    /// Emit line tables and the filename into the unit
    pub debug_info: bool,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn no_exec(mut self) -> Self {
        self.no_exec = true;
        self
    }

    pub fn with_debug_info(mut self) -> Self {
        self.debug_info = true;
        self
    }

    /// Label for diagnostics, `-` when no filename was given
    pub fn label(&self) -> &str {
        self.filename.as_deref().unwrap_or("-")
    }
}

/// Parse and compile `source` into a top-level unit
pub fn compile(source: &str, context: &CompileContext) -> CompileResult<Unit> {
    debug!(file = context.label(), bytes = source.len(), "compiling source");
    let program = crate::parser::parse(source).map_err(|error| CompileError::Parse {
        file: context.label().to_string(),
        error,
    })?;
    CodeGenerator::new(context).compile_program(&program)
}
