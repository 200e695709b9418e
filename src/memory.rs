//! Bounds-checked byte containers: loaded files and simulated address spaces.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::DisassemblyError;

/// Size of the full 6502 address space.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// Byte order used for 16-bit reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Read-only view of a byte container, as handed over by a file loader.
pub trait ByteSource {
    /// Human-readable name, usually the file name.
    fn name(&self) -> &str;

    fn bytes(&self) -> &[u8];

    fn len(&self) -> usize {
        self.bytes().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read8(&self, offset: usize) -> Result<u8, DisassemblyError> {
        self.bytes()
            .get(offset)
            .copied()
            .ok_or(DisassemblyError::OutOfRange { offset, len: self.len() })
    }

    /// Endian-aware word read; both bytes must be in range.
    fn read16(&self, offset: usize) -> Result<u16, DisassemblyError>;

    /// True if `sequence` occurs at `offset`. Never reads out of bounds.
    fn submatch(&self, sequence: &[u8], offset: usize) -> bool {
        offset
            .checked_add(sequence.len())
            .and_then(|end| self.bytes().get(offset..end))
            .is_some_and(|window| window == sequence)
    }
}

/// Fixed-size, zero-based byte container.
///
/// The executable and writable flags are advisory: they are not enforced on
/// individual reads, but the tracer refuses to run over non-executable memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    name: String,
    bytes: Vec<u8>,
    endian: Endian,
    executable: bool,
    writable: bool,
}

impl Memory {
    /// Zero-filled memory of `size` bytes.
    pub fn new(name: impl Into<String>, size: usize, endian: Endian) -> Result<Self, DisassemblyError> {
        if size == 0 {
            return Err(DisassemblyError::InvalidMemorySize(size));
        }
        Ok(Self {
            name: name.into(),
            bytes: vec![0; size],
            endian,
            executable: false,
            writable: false,
        })
    }

    /// Wrap already loaded file contents.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, endian: Endian) -> Self {
        Self {
            name: name.into(),
            bytes,
            endian,
            executable: false,
            writable: false,
        }
    }

    /// A 64 KiB little-endian, executable and writable address space.
    pub fn address_space(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: vec![0; ADDRESS_SPACE],
            endian: Endian::Little,
            executable: true,
            writable: true,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn set_executable(&mut self, executable: bool) -> &mut Self {
        self.executable = executable;
        self
    }

    pub fn set_writable(&mut self, writable: bool) -> &mut Self {
        self.writable = writable;
        self
    }

    /// Copy `bytes` into memory starting at `location`.
    pub fn load(&mut self, bytes: &[u8], location: usize) -> Result<(), DisassemblyError> {
        let end = location
            .checked_add(bytes.len())
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DisassemblyError::Overflow {
                location,
                len: bytes.len(),
                size: self.bytes.len(),
            })?;
        self.bytes[location..end].copy_from_slice(bytes);
        Ok(())
    }
}

impl ByteSource for Memory {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn read16(&self, offset: usize) -> Result<u16, DisassemblyError> {
        let window = offset
            .checked_add(2)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(DisassemblyError::OutOfRange { offset, len: self.bytes.len() })?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u16(window),
            Endian::Big => BigEndian::read_u16(window),
        })
    }
}
