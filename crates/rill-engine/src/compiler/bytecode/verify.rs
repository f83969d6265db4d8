//! Bytecode verification

use super::encoder::BytecodeReader;
use super::opcode::Opcode;
use super::unit::Unit;
use std::collections::HashSet;

/// Bytecode verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Invalid opcode
    #[error("Invalid opcode {opcode:#x} at offset {offset}")]
    InvalidOpcode {
        /// Offending byte
        opcode: u8,
        /// Offset of the byte
        offset: usize,
    },

    /// Instruction operands run past the end of the code
    #[error("Truncated instruction at offset {0}")]
    Truncated(usize),

    /// Invalid jump target
    #[error("Invalid jump target {target} at offset {offset}")]
    InvalidJumpTarget {
        /// Computed target
        target: i64,
        /// Offset of the jump instruction
        offset: usize,
    },

    /// Reference to a missing constant, symbol or child unit
    #[error("Invalid {kind} reference: index {index} at offset {offset}")]
    InvalidReference {
        /// Table being referenced
        kind: &'static str,
        /// Referenced index
        index: usize,
        /// Offset of the instruction
        offset: usize,
    },

    /// Invalid local variable reference
    #[error("Invalid local variable reference: index {index} (max {max}) at offset {offset}")]
    InvalidLocalRef {
        /// Referenced slot
        index: usize,
        /// Number of slots in the unit
        max: usize,
        /// Offset of the instruction
        offset: usize,
    },

    /// More parameters than local slots
    #[error("Unit declares {params} parameters but only {locals} locals")]
    ParamsExceedLocals {
        /// Declared parameter count
        params: u16,
        /// Declared local count
        locals: u16,
    },

    /// Unit has no code
    #[error("Unit has no code")]
    EmptyCode,

    /// Execution falls off end
    #[error("Execution falls off end of unit at offset {0}")]
    FallOffEnd(usize),
}

/// Parsed instruction
#[derive(Debug, Clone, Copy)]
struct Instruction {
    offset: usize,
    opcode: Opcode,
    /// Operand value widened to i64 (first operand for multi-operand opcodes)
    operand: i64,
    /// Second operand (child index for DEFINE_METHOD)
    operand2: i64,
    /// Offset of the following instruction
    next: usize,
}

/// Verify a unit and all of its children
pub fn verify_unit(unit: &Unit) -> Result<(), VerifyError> {
    if unit.param_count > unit.local_count {
        return Err(VerifyError::ParamsExceedLocals {
            params: unit.param_count,
            locals: unit.local_count,
        });
    }
    if unit.code.is_empty() {
        return Err(VerifyError::EmptyCode);
    }

    let instructions = parse_instructions(&unit.code)?;
    let boundaries: HashSet<usize> = instructions.iter().map(|i| i.offset).collect();

    for instr in &instructions {
        check_operands(instr, unit, &boundaries)?;
    }

    if let Some(last) = instructions.last() {
        if !last.opcode.is_terminator() {
            return Err(VerifyError::FallOffEnd(last.offset));
        }
    }

    for child in &unit.children {
        verify_unit(child)?;
    }
    Ok(())
}

fn parse_instructions(code: &[u8]) -> Result<Vec<Instruction>, VerifyError> {
    let mut instructions = Vec::new();
    let mut reader = BytecodeReader::new(code);

    while reader.has_more() {
        let offset = reader.position();
        let opcode = reader.read_opcode().map_err(|_| VerifyError::InvalidOpcode {
            opcode: code[offset],
            offset,
        })?;
        let truncated = |_| VerifyError::Truncated(offset);

        let (operand, operand2) = match opcode.operand_size() {
            0 => (0, 0),
            2 => (reader.read_u16().map_err(truncated)? as i64, 0),
            3 => {
                let symbol = reader.read_u16().map_err(truncated)? as i64;
                let argc = reader.read_u8().map_err(truncated)? as i64;
                (symbol, argc)
            }
            4 if opcode.is_jump() => (reader.read_i32().map_err(truncated)? as i64, 0),
            4 => {
                let symbol = reader.read_u16().map_err(truncated)? as i64;
                let child = reader.read_u16().map_err(truncated)? as i64;
                (symbol, child)
            }
            _ => unreachable!("operand sizes are 0, 2, 3 or 4"),
        };

        instructions.push(Instruction {
            offset,
            opcode,
            operand,
            operand2,
            next: reader.position(),
        });
    }

    Ok(instructions)
}

fn check_operands(
    instr: &Instruction,
    unit: &Unit,
    boundaries: &HashSet<usize>,
) -> Result<(), VerifyError> {
    let index = instr.operand as usize;
    let reference = |kind: &'static str, len: usize, index: usize| {
        if index < len {
            Ok(())
        } else {
            Err(VerifyError::InvalidReference {
                kind,
                index,
                offset: instr.offset,
            })
        }
    };

    match instr.opcode {
        Opcode::LoadInt => reference("integer", unit.constants.integers.len(), index),
        Opcode::LoadFloat => reference("float", unit.constants.floats.len(), index),
        Opcode::LoadStr => reference("string", unit.constants.strings.len(), index),
        Opcode::LoadGlobal | Opcode::StoreGlobal | Opcode::Send => {
            reference("symbol", unit.symbols.len(), index)
        }
        Opcode::DefineMethod => {
            reference("symbol", unit.symbols.len(), index)?;
            reference("child", unit.children.len(), instr.operand2 as usize)
        }
        Opcode::LoadLocal | Opcode::StoreLocal => {
            if index < unit.local_count as usize {
                Ok(())
            } else {
                Err(VerifyError::InvalidLocalRef {
                    index,
                    max: unit.local_count as usize,
                    offset: instr.offset,
                })
            }
        }
        op if op.is_jump() => {
            let target = instr.next as i64 + instr.operand;
            if target >= 0 && boundaries.contains(&(target as usize)) {
                Ok(())
            } else {
                Err(VerifyError::InvalidJumpTarget {
                    target,
                    offset: instr.offset,
                })
            }
        }
        _ => Ok(()),
    }
}
