//! Bytecode opcodes for the Rill VM
//!
//! Every instruction is a single opcode byte followed by its operands.
//! Operands are little-endian and their widths are fixed per opcode
//! (see [`Opcode::operand_size`]).

/// Bytecode opcode enumeration
///
/// Opcodes are grouped by range:
/// - 0x00-0x0F: Stack manipulation & constants
/// - 0x10-0x1F: Locals and globals
/// - 0x20-0x2F: Arithmetic & logical
/// - 0x30-0x3F: Comparison
/// - 0x40-0x4F: Control flow
/// - 0x50-0x5F: Calls & method definition
/// - 0x60-0x6F: Return & exceptions
/// - 0x70: Legacy VM halt
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack Manipulation & Constants (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// Pop top value from stack
    Pop = 0x01,
    /// Duplicate top stack value
    Dup = 0x02,

    /// Push nil
    LoadNil = 0x04,
    /// Push true
    LoadTrue = 0x05,
    /// Push false
    LoadFalse = 0x06,
    /// Push the frame's receiver
    LoadSelf = 0x07,
    /// Push integer constant (operand: u16 pool index)
    LoadInt = 0x08,
    /// Push float constant (operand: u16 pool index)
    LoadFloat = 0x09,
    /// Push string constant (operand: u16 pool index)
    LoadStr = 0x0A,

    // ===== Locals & Globals (0x10-0x1F) =====
    /// Push local variable (operand: u16 slot)
    LoadLocal = 0x10,
    /// Pop into local variable (operand: u16 slot)
    StoreLocal = 0x11,
    /// Push global variable (operand: u16 symbol index)
    LoadGlobal = 0x12,
    /// Pop into global variable (operand: u16 symbol index)
    StoreGlobal = 0x13,

    // ===== Arithmetic & Logical (0x20-0x2F) =====
    /// pop b, pop a, push a + b (numbers, or string concatenation)
    Add = 0x20,
    /// pop b, pop a, push a - b
    Sub = 0x21,
    /// pop b, pop a, push a * b
    Mul = 0x22,
    /// pop b, pop a, push a / b
    Div = 0x23,
    /// pop b, pop a, push a % b
    Mod = 0x24,
    /// Negate top of stack
    Neg = 0x25,
    /// Logical not of top of stack
    Not = 0x26,

    // ===== Comparison (0x30-0x3F) =====
    /// Equality
    Eq = 0x30,
    /// Inequality
    Ne = 0x31,
    /// Less than
    Lt = 0x32,
    /// Less than or equal
    Le = 0x33,
    /// Greater than
    Gt = 0x34,
    /// Greater than or equal
    Ge = 0x35,

    // ===== Control Flow (0x40-0x4F) =====
    /// Unconditional jump (operand: i32 offset relative to the next instruction)
    Jmp = 0x40,
    /// Pop and jump if falsy (operand: i32 offset)
    JmpIfFalse = 0x41,
    /// Pop and jump if truthy (operand: i32 offset)
    JmpIfTrue = 0x42,

    // ===== Calls (0x50-0x5F) =====
    /// Call a method on self (operands: u16 symbol index, u8 argument count)
    Send = 0x50,
    /// Define a method on the frame's target class
    /// (operands: u16 symbol index, u16 child unit index)
    DefineMethod = 0x51,

    // ===== Return & Exceptions (0x60-0x6F) =====
    /// Return top of stack from the current unit
    Return = 0x60,
    /// Raise top of stack
    Raise = 0x61,
    /// Install an exception handler (operand: i32 offset of the handler)
    PushHandler = 0x62,
    /// Remove the innermost exception handler
    PopHandler = 0x63,

    /// Halt the whole VM run (emitted by old toolchains at the end of a unit)
    Stop = 0x70,
}

impl Opcode {
    /// Convert byte to opcode
    ///
    /// Returns None if the byte does not correspond to a valid opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Pop),
            0x02 => Some(Self::Dup),
            0x04 => Some(Self::LoadNil),
            0x05 => Some(Self::LoadTrue),
            0x06 => Some(Self::LoadFalse),
            0x07 => Some(Self::LoadSelf),
            0x08 => Some(Self::LoadInt),
            0x09 => Some(Self::LoadFloat),
            0x0A => Some(Self::LoadStr),

            0x10 => Some(Self::LoadLocal),
            0x11 => Some(Self::StoreLocal),
            0x12 => Some(Self::LoadGlobal),
            0x13 => Some(Self::StoreGlobal),

            0x20 => Some(Self::Add),
            0x21 => Some(Self::Sub),
            0x22 => Some(Self::Mul),
            0x23 => Some(Self::Div),
            0x24 => Some(Self::Mod),
            0x25 => Some(Self::Neg),
            0x26 => Some(Self::Not),

            0x30 => Some(Self::Eq),
            0x31 => Some(Self::Ne),
            0x32 => Some(Self::Lt),
            0x33 => Some(Self::Le),
            0x34 => Some(Self::Gt),
            0x35 => Some(Self::Ge),

            0x40 => Some(Self::Jmp),
            0x41 => Some(Self::JmpIfFalse),
            0x42 => Some(Self::JmpIfTrue),

            0x50 => Some(Self::Send),
            0x51 => Some(Self::DefineMethod),

            0x60 => Some(Self::Return),
            0x61 => Some(Self::Raise),
            0x62 => Some(Self::PushHandler),
            0x63 => Some(Self::PopHandler),

            0x70 => Some(Self::Stop),

            _ => None,
        }
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes following the opcode byte
    pub fn operand_size(self) -> usize {
        match self {
            Self::LoadInt
            | Self::LoadFloat
            | Self::LoadStr
            | Self::LoadLocal
            | Self::StoreLocal
            | Self::LoadGlobal
            | Self::StoreGlobal => 2,
            Self::Jmp | Self::JmpIfFalse | Self::JmpIfTrue | Self::PushHandler => 4,
            Self::Send => 3,
            Self::DefineMethod => 4,
            _ => 0,
        }
    }

    /// Check if this opcode carries a relative jump offset
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Self::Jmp | Self::JmpIfFalse | Self::JmpIfTrue | Self::PushHandler
        )
    }

    /// Check if execution can never fall through to the next instruction
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Return | Self::Raise | Self::Jmp | Self::Stop)
    }

    /// Get the mnemonic for this opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::LoadNil => "LOAD_NIL",
            Self::LoadTrue => "LOAD_TRUE",
            Self::LoadFalse => "LOAD_FALSE",
            Self::LoadSelf => "LOAD_SELF",
            Self::LoadInt => "LOAD_INT",
            Self::LoadFloat => "LOAD_FLOAT",
            Self::LoadStr => "LOAD_STR",
            Self::LoadLocal => "LOAD_LOCAL",
            Self::StoreLocal => "STORE_LOCAL",
            Self::LoadGlobal => "LOAD_GLOBAL",
            Self::StoreGlobal => "STORE_GLOBAL",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Neg => "NEG",
            Self::Not => "NOT",
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Jmp => "JMP",
            Self::JmpIfFalse => "JMP_IF_FALSE",
            Self::JmpIfTrue => "JMP_IF_TRUE",
            Self::Send => "SEND",
            Self::DefineMethod => "DEFINE_METHOD",
            Self::Return => "RETURN",
            Self::Raise => "RAISE",
            Self::PushHandler => "PUSH_HANDLER",
            Self::PopHandler => "POP_HANDLER",
            Self::Stop => "STOP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_u8(byte) {
                assert_eq!(op.to_u8(), byte);
            }
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_u8(0x03), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_terminator_detection() {
        assert!(Opcode::Return.is_terminator());
        assert!(Opcode::Stop.is_terminator());
        assert!(Opcode::Raise.is_terminator());
        assert!(Opcode::Jmp.is_terminator());
        assert!(!Opcode::JmpIfFalse.is_terminator());
        assert!(!Opcode::Send.is_terminator());
    }

    #[test]
    fn test_operand_sizes() {
        assert_eq!(Opcode::LoadNil.operand_size(), 0);
        assert_eq!(Opcode::LoadStr.operand_size(), 2);
        assert_eq!(Opcode::Send.operand_size(), 3);
        assert_eq!(Opcode::JmpIfTrue.operand_size(), 4);
        assert_eq!(Opcode::DefineMethod.operand_size(), 4);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::Stop.name(), "STOP");
        assert_eq!(Opcode::PushHandler.name(), "PUSH_HANDLER");
    }
}
