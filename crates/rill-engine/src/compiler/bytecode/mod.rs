//! Bytecode definitions and the binary unit format

pub mod constants;
pub mod encoder;
pub mod opcode;
pub mod unit;
pub mod verify;

pub use constants::ConstantPool;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use opcode::Opcode;
pub use unit::{DebugInfo, LineEntry, ModuleError, Unit, HEADER_SIZE, MAGIC, VERSION};
pub use verify::{verify_unit, VerifyError};
