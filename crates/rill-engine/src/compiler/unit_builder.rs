//! Builder for bytecode units

use super::bytecode::{BytecodeWriter, DebugInfo, Opcode, Unit};
use super::error::{CompileError, CompileResult};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Helper for building one unit (the program body or one function body)
pub struct UnitBuilder {
    pub(crate) writer: BytecodeWriter,
    unit: Unit,
    locals: FxHashMap<String, u16>,
    /// False for the top-level unit, where variables are globals
    is_function: bool,
    debug_info: Option<DebugInfo>,
}

impl UnitBuilder {
    /// Builder for the top-level program unit
    pub fn program(debug_info: Option<DebugInfo>) -> Self {
        Self {
            writer: BytecodeWriter::new(),
            unit: Unit::new(),
            locals: FxHashMap::default(),
            is_function: false,
            debug_info,
        }
    }

    /// Builder for a function body with the given parameters in slots `0..n`
    pub fn function(
        name: &str,
        params: &[String],
        debug_info: Option<DebugInfo>,
    ) -> CompileResult<Self> {
        if params.len() > u8::MAX as usize {
            return Err(CompileError::TooManyParameters);
        }
        let mut locals = FxHashMap::default();
        for param in params {
            let slot = locals.len() as u16;
            if locals.insert(param.clone(), slot).is_some() {
                return Err(CompileError::DuplicateParameter {
                    name: param.clone(),
                    function: name.to_string(),
                });
            }
        }
        let mut unit = Unit::new();
        unit.param_count = params.len() as u16;
        unit.local_count = params.len() as u16;
        Ok(Self {
            writer: BytecodeWriter::new(),
            unit,
            locals,
            is_function: true,
            debug_info,
        })
    }

    /// Whether this builder compiles a function body
    pub fn in_function(&self) -> bool {
        self.is_function
    }

    /// Allocate a new local variable, returning its index
    pub fn add_local(&mut self, name: &str) -> CompileResult<u16> {
        if let Some(&index) = self.locals.get(name) {
            return Ok(index);
        }
        if self.unit.local_count == u16::MAX {
            return Err(CompileError::TooManyLocals);
        }
        let index = self.unit.local_count;
        self.unit.local_count += 1;
        self.locals.insert(name.to_string(), index);
        Ok(index)
    }

    /// Get the index of a local variable
    pub fn get_local(&self, name: &str) -> Option<u16> {
        self.locals.get(name).copied()
    }

    pub fn add_string(&mut self, s: &str) -> CompileResult<u16> {
        to_index(self.unit.constants.add_string(s), CompileError::TooManyConstants)
    }

    pub fn add_integer(&mut self, i: i64) -> CompileResult<u16> {
        to_index(self.unit.constants.add_integer(i), CompileError::TooManyConstants)
    }

    pub fn add_float(&mut self, f: f64) -> CompileResult<u16> {
        to_index(self.unit.constants.add_float(f), CompileError::TooManyConstants)
    }

    pub fn add_symbol(&mut self, name: &str) -> CompileResult<u16> {
        to_index(self.unit.add_symbol(name), CompileError::TooManySymbols)
    }

    /// Attach a compiled function body, returning its child index
    pub fn add_child(&mut self, child: Unit) -> CompileResult<u16> {
        if self.unit.children.len() >= u16::MAX as usize {
            return Err(CompileError::TooManyFunctions);
        }
        self.unit.children.push(Rc::new(child));
        Ok((self.unit.children.len() - 1) as u16)
    }

    /// Record the source line for code emitted from here on
    pub fn mark_line(&mut self, line: u32) {
        let offset = self.writer.offset();
        if let Some(info) = self.debug_info.as_mut() {
            info.mark(offset, line);
        }
    }

    pub fn emit(&mut self, opcode: Opcode) {
        self.writer.emit_opcode(opcode);
    }

    pub fn emit_with_u16(&mut self, opcode: Opcode, operand: u16) {
        self.writer.emit_with_u16(opcode, operand);
    }

    /// Build the final unit, appending an implicit `RETURN` of the value on the stack
    pub fn build(mut self) -> Unit {
        self.writer.emit_opcode(Opcode::Return);
        self.unit.code = self.writer.into_bytes();
        self.unit.debug_info = self.debug_info;
        self.unit
    }
}

fn to_index(index: u32, overflow: CompileError) -> CompileResult<u16> {
    u16::try_from(index).map_err(|_| overflow)
}
