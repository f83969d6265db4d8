//! Bytecode unit format
//!
//! A [`Unit`] is the compiled form of a program or a function body. Units
//! nest: each `fn` declaration becomes a child unit referenced by index from
//! `DEFINE_METHOD`. The serialized form is self-delimiting so that a unit can
//! be read back from a raw pointer into a shared library's data section.

use super::constants::ConstantPool;
use super::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use super::opcode::Opcode;
use super::verify::{verify_unit, VerifyError};
use std::io::{Read, Write};
use std::rc::Rc;
use thiserror::Error;

/// Magic number for Rill bytecode files: "RILL"
pub const MAGIC: [u8; 4] = *b"RILL";

/// Current bytecode version
pub const VERSION: u32 = 1;

/// Size of the fixed header: magic + version + flags + length + crc32
pub const HEADER_SIZE: usize = 20;

/// Hard cap on unit nesting accepted by the decoder
pub const MAX_DECODE_DEPTH: usize = 255;

/// Unit flags
pub mod flags {
    /// Units carry debug information
    pub const HAS_DEBUG_INFO: u32 = 1 << 0;
}

/// Unit encoding/decoding errors
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected RILL, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Declared length disagrees with the available data
    #[error("Length mismatch: header declares {declared} bytes, found {actual}")]
    LengthMismatch {
        /// Length from the header
        declared: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Stored checksum value
        expected: u32,
        /// Computed checksum value
        actual: u32,
    },

    /// Bytes left over after the root unit
    #[error("{0} trailing bytes after unit")]
    TrailingBytes(usize),

    /// Child units nested deeper than the decoder accepts
    #[error("Units nested deeper than {MAX_DECODE_DEPTH} levels")]
    NestingTooDeep,

    /// Bytecode failed verification
    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Stream I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Debug information for a unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugInfo {
    /// Source path label, if one was given at compile time
    pub filename: Option<String>,
    /// Line table sorted by bytecode offset
    pub lines: Vec<LineEntry>,
}

/// Maps a bytecode offset to a source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    /// Bytecode offset within the unit's code
    pub offset: u32,
    /// Line number (1-indexed)
    pub line: u32,
}

impl DebugInfo {
    /// Create debug info for the given source label
    pub fn new(filename: Option<String>) -> Self {
        Self {
            filename,
            lines: Vec::new(),
        }
    }

    /// Record that code starting at `offset` comes from `line`
    pub fn mark(&mut self, offset: usize, line: u32) {
        match self.lines.last() {
            Some(last) if last.line == line => {}
            Some(last) if last.offset as usize == offset => {
                if let Some(last) = self.lines.last_mut() {
                    last.line = line;
                }
            }
            _ => self.lines.push(LineEntry {
                offset: offset as u32,
                line,
            }),
        }
    }

    /// Look up the source line covering a bytecode offset
    pub fn line_for(&self, offset: usize) -> Option<u32> {
        let idx = self
            .lines
            .partition_point(|e| e.offset as usize <= offset);
        if idx == 0 {
            self.lines.first().map(|e| e.line)
        } else {
            Some(self.lines[idx - 1].line)
        }
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        match &self.filename {
            Some(name) => {
                writer.emit_u8(1);
                writer.emit_string(name);
            }
            None => writer.emit_u8(0),
        }
        writer.emit_u32(self.lines.len() as u32);
        for entry in &self.lines {
            writer.emit_u32(entry.offset);
            writer.emit_u32(entry.line);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let filename = if reader.read_u8()? != 0 {
            Some(reader.read_string()?)
        } else {
            None
        };
        let count = reader.read_u32()? as usize;
        let mut lines = Vec::with_capacity(count.min(reader.remaining() / 8));
        for _ in 0..count {
            let offset = reader.read_u32()?;
            let line = reader.read_u32()?;
            lines.push(LineEntry { offset, line });
        }
        Ok(Self { filename, lines })
    }
}

/// A compiled Rill bytecode unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unit {
    /// Number of parameters (occupying the first local slots)
    pub param_count: u16,
    /// Number of local slots, parameters included
    pub local_count: u16,
    /// Stack-based bytecode instructions
    pub code: Vec<u8>,
    /// Literal constants
    pub constants: ConstantPool,
    /// Names referenced by globals, sends and method definitions
    pub symbols: Vec<String>,
    /// Nested units (function bodies)
    pub children: Vec<Rc<Unit>>,
    /// Source mapping, when compiled with debug info
    pub debug_info: Option<DebugInfo>,
}

impl Unit {
    /// Create an empty unit
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a symbol name and return its index
    pub fn add_symbol(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.symbols.iter().position(|s| s == name) {
            return idx as u32;
        }
        self.symbols.push(name.to_string());
        (self.symbols.len() - 1) as u32
    }

    /// Get a symbol name by index
    pub fn symbol(&self, index: u16) -> Option<&str> {
        self.symbols.get(index as usize).map(|s| s.as_str())
    }

    /// Nesting depth of this unit (a unit without children has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Length of the longest string constant across the unit tree
    pub fn longest_string(&self) -> usize {
        let own = self.constants.strings.iter().map(|s| s.len()).max().unwrap_or(0);
        self.children
            .iter()
            .map(|c| c.longest_string())
            .fold(own, usize::max)
    }

    /// Source label recorded in the debug info
    pub fn filename(&self) -> Option<&str> {
        self.debug_info.as_ref().and_then(|d| d.filename.as_deref())
    }

    /// Check whether the last instruction is a bare `STOP`
    pub fn ends_with_stop(&self) -> bool {
        self.code.last() == Some(&Opcode::Stop.to_u8())
    }

    fn has_debug_info(&self) -> bool {
        self.debug_info.is_some() || self.children.iter().any(|c| c.has_debug_info())
    }

    /// Encode the unit to the binary format (.rbc)
    ///
    /// Format:
    /// - Header: magic (4) + version (u32) + flags (u32) + total length (u32) + crc32 (u32)
    /// - Root unit, children encoded recursively after the parent's tables
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();
        let flags = if self.has_debug_info() {
            flags::HAS_DEBUG_INFO
        } else {
            0
        };

        writer.emit_bytes(&MAGIC);
        writer.emit_u32(VERSION);
        writer.emit_u32(flags);
        let length_offset = writer.offset();
        writer.emit_u32(0); // Placeholder for total length
        let crc32_offset = writer.offset();
        writer.emit_u32(0); // Placeholder for CRC32

        self.encode_body(&mut writer, flags);

        let total = writer.offset() as u32;
        let crc32 = crc32fast::hash(&writer.buffer()[HEADER_SIZE..]);
        writer.patch_u32(length_offset, total);
        writer.patch_u32(crc32_offset, crc32);
        writer.into_bytes()
    }

    /// Serialize the unit into a stream
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.encode())?;
        out.flush()
    }

    fn encode_body(&self, writer: &mut BytecodeWriter, flags: u32) {
        writer.emit_u16(self.param_count);
        writer.emit_u16(self.local_count);
        writer.emit_u32(self.code.len() as u32);
        writer.emit_bytes(&self.code);
        self.constants.encode(writer);

        writer.emit_u32(self.symbols.len() as u32);
        for name in &self.symbols {
            writer.emit_string(name);
        }

        writer.emit_u32(self.children.len() as u32);
        for child in &self.children {
            child.encode_body(writer, flags);
        }

        if (flags & flags::HAS_DEBUG_INFO) != 0 {
            match &self.debug_info {
                Some(info) => {
                    writer.emit_u8(1);
                    info.encode(writer);
                }
                None => writer.emit_u8(0),
            }
        }
    }

    /// Decode a unit from a complete serialized buffer
    pub fn decode(data: &[u8]) -> Result<Self, ModuleError> {
        let declared = Self::check_header(data)?;
        if declared != data.len() {
            if declared < data.len() {
                return Err(ModuleError::TrailingBytes(data.len() - declared));
            }
            return Err(ModuleError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let mut reader = BytecodeReader::new(data);
        reader.read_bytes(8)?; // magic + version, checked above
        let flags = reader.read_u32()?;
        reader.read_u32()?; // total length, checked above
        let stored_crc32 = reader.read_u32()?;

        let calculated_crc32 = crc32fast::hash(&data[HEADER_SIZE..]);
        if stored_crc32 != calculated_crc32 {
            return Err(ModuleError::ChecksumMismatch {
                expected: stored_crc32,
                actual: calculated_crc32,
            });
        }

        let unit = Self::decode_body(&mut reader, flags, 1)?;
        if reader.has_more() {
            return Err(ModuleError::TrailingBytes(reader.remaining()));
        }
        verify_unit(&unit)?;
        Ok(unit)
    }

    /// Decode a unit from a pointer to a serialized blob.
    ///
    /// The header is read first; its length field bounds the rest of the read.
    ///
    /// # Safety
    ///
    /// `data` must point to readable memory holding at least a full header,
    /// and, when the magic matches, as many bytes as the header declares.
    pub unsafe fn decode_from_ptr(data: *const u8) -> Result<Self, ModuleError> {
        let header = std::slice::from_raw_parts(data, HEADER_SIZE);
        let declared = Self::check_header(header)?;
        let full = std::slice::from_raw_parts(data, declared);
        Self::decode(full)
    }

    /// Read exactly one serialized unit from a stream.
    ///
    /// The header's length field decides how many bytes are consumed, so
    /// anything after the unit is left unread. The body buffer grows with the
    /// bytes actually read, never with the declared length alone.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self, ModuleError> {
        let mut data = vec![0u8; HEADER_SIZE];
        reader.read_exact(&mut data)?;
        let declared = Self::check_header(&data)?;
        let body_len = (declared - HEADER_SIZE) as u64;
        Read::take(&mut *reader, body_len).read_to_end(&mut data)?;
        if data.len() != declared {
            return Err(ModuleError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }
        Self::decode(&data)
    }

    /// Validate magic and version, and return the declared total length
    fn check_header(data: &[u8]) -> Result<usize, ModuleError> {
        let mut reader = BytecodeReader::new(data);
        let magic: [u8; 4] = reader
            .read_bytes(4)?
            .try_into()
            .map_err(|_| DecodeError::UnexpectedEnd(0))?;
        if magic != MAGIC {
            return Err(ModuleError::InvalidMagic(magic));
        }
        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ModuleError::UnsupportedVersion(version));
        }
        reader.read_u32()?; // flags
        let declared = reader.read_u32()? as usize;
        reader.read_u32()?; // crc32
        if declared < HEADER_SIZE {
            return Err(ModuleError::LengthMismatch {
                declared,
                actual: HEADER_SIZE,
            });
        }
        Ok(declared)
    }

    fn decode_body(
        reader: &mut BytecodeReader<'_>,
        flags: u32,
        depth: usize,
    ) -> Result<Self, ModuleError> {
        if depth > MAX_DECODE_DEPTH {
            return Err(ModuleError::NestingTooDeep);
        }

        let param_count = reader.read_u16()?;
        let local_count = reader.read_u16()?;
        let code_len = reader.read_u32()? as usize;
        let code = reader.read_bytes(code_len)?;
        let constants = ConstantPool::decode(reader)?;

        let symbol_count = reader.read_u32()? as usize;
        let mut symbols = Vec::with_capacity(symbol_count.min(reader.remaining() / 4));
        for _ in 0..symbol_count {
            symbols.push(reader.read_string()?);
        }

        let child_count = reader.read_u32()? as usize;
        let mut children = Vec::with_capacity(child_count.min(reader.remaining()));
        for _ in 0..child_count {
            children.push(Rc::new(Self::decode_body(reader, flags, depth + 1)?));
        }

        let debug_info = if (flags & flags::HAS_DEBUG_INFO) != 0 && reader.read_u8()? != 0 {
            Some(DebugInfo::decode(reader)?)
        } else {
            None
        };

        Ok(Self {
            param_count,
            local_count,
            code,
            constants,
            symbols,
            children,
            debug_info,
        })
    }
}
