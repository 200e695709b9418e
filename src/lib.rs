//! Disassembler and static code tracer for Commodore VIC-20/C64 6502 binaries.
//!
//! The crate turns raw program or cartridge images into an annotated listing and
//! approximates which bytes are reachable code by following control flow from
//! the known entry points, without modelling register or memory values.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::fs;
//! use cbm_disasm::{
//!     memory::{Endian, Memory},
//!     parser::PrgParser,
//!     strategy::{Disassembler, Tracer},
//!     MetaParser, // Import the trait to bring parse() method into scope
//! };
//!
//! // Read a .prg file
//! let bytes = fs::read("path/to/game.prg").unwrap();
//!
//! // Work out load address, entry points and edicts
//! let meta = PrgParser::c64().parse(&bytes).unwrap();
//! let file = Memory::from_bytes("game.prg", bytes, Endian::Little);
//!
//! // Linear listing of the whole file
//! let mut disassembler = Disassembler::new(&file, &meta);
//! let lines: Vec<_> = disassembler.by_ref().collect();
//!
//! // Static trace from the entry points
//! let space = cbm_disasm::strategy::load_binary(&file, &meta).unwrap();
//! let entries: Vec<u16> = meta.execution_entry_points().iter().map(|e| e.address).collect();
//! let mut tracer = Tracer::new(&disassembler, &space, &entries).unwrap();
//! tracer.trace(100_000);
//! ```

pub mod decoder;
pub mod format;
pub mod isa;
pub mod line;
pub mod memory;
pub mod meta;
pub mod parser;
pub mod strategy;
pub mod symbols;

pub use crate::line::{Annotations, DataKind, FullInstruction, InstructionLike};
pub use crate::meta::{DisassemblyMeta, Edict, EntryPoint};

use crate::memory::ByteSource;

/// Single-instruction decoder for one instruction set.
///
/// Implementations are stateless with respect to position so one decoder can
/// serve any number of trace paths.
pub trait Decoder: Send + Sync {
    /// Decode ONE instruction at offset `at` of `memory`.
    ///
    /// Returns `Ok(None)` for an opcode the instruction set does not define and
    /// an error when fewer bytes remain than the instruction needs.
    fn decode(&self, memory: &dyn ByteSource, at: usize) -> Result<Option<FullInstruction>, DisassemblyError>;
}

/// Parser trait: turn raw file bytes into `DisassemblyMeta`.
pub trait MetaParser: Send + Sync {
    /// Parse file data into metadata
    ///
    /// # Arguments
    /// * `data` - The complete file contents, header included
    ///
    /// # Returns
    /// Result containing DisassemblyMeta if the layout matched
    fn parse(&self, data: &[u8]) -> Result<DisassemblyMeta, DisassemblyError>;
}

/// Error type for disassembly operations
#[derive(Debug, thiserror::Error)]
pub enum DisassemblyError {
    /// Failed to parse binary format
    #[error("Failed to parse binary format: {0}")]
    ParsingError(String),

    /// Opcode registered twice in one instruction set
    #[error("Opcode ${0:02x} is already registered")]
    DuplicateOpcode(u8),

    /// Instruction length outside 0..=3
    #[error("Invalid length {length} for opcode ${opcode:02x}")]
    InvalidLength { opcode: u8, length: u8 },

    #[error("Invalid memory size: {0}")]
    InvalidMemorySize(usize),

    /// Read outside a byte source
    #[error("Offset {offset} is outside the {len} byte source")]
    OutOfRange { offset: usize, len: usize },

    /// Load that would run past the end of memory
    #[error("Loading {len} bytes at {location} overflows {size} byte memory")]
    Overflow { location: usize, len: usize, size: usize },

    /// Single-shot decode ran out of bytes
    #[error("Not enough bytes to decode instruction at offset {offset}")]
    InsufficientBytes { offset: usize },

    #[error("Memory '{0}' is not executable")]
    NotExecutable(String),

    /// Initial program counter outside memory
    #[error("Program counter {0:#06x} is outside memory bounds")]
    PcOutOfBounds(usize),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Two edicts declared at the same offset
    #[error("Edict already declared at offset {0}")]
    DuplicateEdict(usize),

    /// Output formatting error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}

impl From<serde_json::Error> for DisassemblyError {
    fn from(e: serde_json::Error) -> Self {
        DisassemblyError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for DisassemblyError {
    fn from(e: csv::Error) -> Self {
        DisassemblyError::Serialization(e.to_string())
    }
}
