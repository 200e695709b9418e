//! Commodore file layout parsers producing [`DisassemblyMeta`].
//!
//! Choosing which parser fits a file is up to the caller; each parser only
//! checks that the layout it understands is present.

use std::fmt;

use clap::ValueEnum;

use crate::line::Annotations;
use crate::meta::{DisassemblyMeta, Edict};
use crate::symbols::SymbolTable;
use crate::{DisassemblyError, MetaParser};

/// BASIC token for `SYS`.
const TOKEN_SYS: u8 = 0x9E;

/// Upper bound on BASIC lines walked while looking for a stub.
const MAX_STUB_LINES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Machine {
    C64,
    Vic20,
}

impl Machine {
    pub fn symbols(self) -> SymbolTable {
        match self {
            Machine::C64 => SymbolTable::c64_kernal(),
            Machine::Vic20 => SymbolTable::vic20_kernal(),
        }
    }

    /// Load addresses of the BASIC program area across memory configurations.
    fn basic_starts(self) -> &'static [u16] {
        match self {
            Machine::C64 => &[0x0801],
            Machine::Vic20 => &[0x1001, 0x0401, 0x1201],
        }
    }

    fn cartridge_base(self) -> u16 {
        match self {
            Machine::C64 => 0x8000,
            Machine::Vic20 => 0xA000,
        }
    }

    fn cartridge_signature(self) -> &'static [u8] {
        match self {
            // "CBM80" in PETSCII
            Machine::C64 => &[0xC3, 0xC2, 0xCD, 0x38, 0x30],
            // "A0CBM"
            Machine::Vic20 => &[0x41, 0x30, 0xC3, 0xC2, 0xCD],
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Machine::C64 => write!(f, "C64"),
            Machine::Vic20 => write!(f, "VIC-20"),
        }
    }
}

fn word_at(data: &[u8], offset: usize) -> Option<u16> {
    let pair = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([pair[0], pair[1]]))
}

/// Headerless blob loaded at a fixed address, executed from its first byte.
#[derive(Debug, Clone)]
pub struct RawParser {
    base: u16,
    symbols: SymbolTable,
}

impl RawParser {
    pub fn new(base: u16, symbols: SymbolTable) -> Self {
        Self { base, symbols }
    }
}

impl MetaParser for RawParser {
    fn parse(&self, data: &[u8]) -> Result<DisassemblyMeta, DisassemblyError> {
        let mut meta = DisassemblyMeta::new(self.base, 0, data.len(), self.symbols.clone());
        if !data.is_empty() {
            meta.add_entry_point(self.base, "start", "first byte of raw image");
        }
        Ok(meta)
    }
}

/// `.prg` file: two-byte little-endian load address followed by the content.
#[derive(Debug, Clone)]
pub struct PrgParser {
    machine: Machine,
    symbols: SymbolTable,
}

impl PrgParser {
    pub fn new(machine: Machine) -> Self {
        Self { machine, symbols: machine.symbols() }
    }

    pub fn c64() -> Self {
        Self::new(Machine::C64)
    }

    pub fn vic20() -> Self {
        Self::new(Machine::Vic20)
    }
}

/// A BASIC program in front of machine code.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BasicStub {
    /// File offset just past the end-of-program marker.
    end: usize,
    sys: Option<u16>,
}

/// Walk the BASIC line links from `offset`; `None` if they do not form a program.
fn find_basic_stub(data: &[u8], base: u16, start: usize) -> Option<BasicStub> {
    let mut offset = start;
    let mut sys = None;
    for _ in 0..MAX_STUB_LINES {
        let link = word_at(data, offset)?;
        if link == 0 {
            return Some(BasicStub { end: offset + 2, sys });
        }
        let text_start = offset + 4;
        let text = data.get(text_start..)?;
        let line_end = text_start + text.iter().position(|&b| b == 0)?;
        if sys.is_none() {
            sys = parse_sys(&data[text_start..line_end]);
        }
        let next = (link as usize).checked_sub(base as usize)? + start;
        if next <= line_end || next >= data.len() {
            return None;
        }
        offset = next;
    }
    None
}

/// Decimal argument of the first `SYS` token in a tokenised BASIC line.
fn parse_sys(line: &[u8]) -> Option<u16> {
    let at = line.iter().position(|&b| b == TOKEN_SYS)?;
    let digits: Vec<u8> = line[at + 1..]
        .iter()
        .copied()
        .skip_while(|&b| b == b' ' || b == b'(')
        .take_while(u8::is_ascii_digit)
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}

impl MetaParser for PrgParser {
    fn parse(&self, data: &[u8]) -> Result<DisassemblyMeta, DisassemblyError> {
        let base = word_at(data, 0).ok_or_else(|| {
            DisassemblyError::ParsingError(format!("{} byte file has no load address", data.len()))
        })?;
        let mut meta = DisassemblyMeta::new(base, 2, data.len(), self.symbols.clone());

        let stub = self
            .machine
            .basic_starts()
            .contains(&base)
            .then(|| find_basic_stub(data, base, 2))
            .flatten();

        match stub {
            Some(stub) => {
                let comment = match stub.sys {
                    Some(sys) => format!("basic stub: sys {sys}"),
                    None => "basic program".to_string(),
                };
                meta.add_edict(Edict::bytes(2, stub.end - 2, Annotations::label("basic").with_comment(comment)))?;
                if let Some(sys) = stub.sys.filter(|&sys| meta.is_in_binary(sys)) {
                    meta.add_entry_point(sys, "start", "sys target of basic stub");
                }
            }
            None if data.len() > 2 => {
                meta.add_entry_point(base, "start", "load address");
            }
            None => {}
        }
        Ok(meta)
    }
}

/// Auto-start cartridge image, optionally with a load-address header.
#[derive(Debug, Clone)]
pub struct CartParser {
    machine: Machine,
    symbols: SymbolTable,
}

impl CartParser {
    pub fn new(machine: Machine) -> Self {
        Self { machine, symbols: machine.symbols() }
    }

    pub fn c64() -> Self {
        Self::new(Machine::C64)
    }

    pub fn vic20() -> Self {
        Self::new(Machine::Vic20)
    }

    fn content_start(&self, data: &[u8]) -> Option<usize> {
        let signature = self.machine.cartridge_signature();
        let base = self.machine.cartridge_base();
        if word_at(data, 0) == Some(base) && data.get(6..11) == Some(signature) {
            return Some(2);
        }
        (data.get(4..9) == Some(signature)).then_some(0)
    }
}

impl MetaParser for CartParser {
    fn parse(&self, data: &[u8]) -> Result<DisassemblyMeta, DisassemblyError> {
        let start = self.content_start(data).ok_or_else(|| {
            DisassemblyError::ParsingError(format!("no {} cartridge signature", self.machine))
        })?;
        let base = self.machine.cartridge_base();
        let mut meta = DisassemblyMeta::new(base, start, data.len(), self.symbols.clone());

        meta.add_edict(Edict::words(
            start,
            2,
            Annotations::label("vectors").with_comment("cold start, warm start"),
        ))?;
        meta.add_edict(Edict::signature(
            start + 4,
            5,
            Annotations::comment("auto-start signature"),
        ))?;

        let vectors = [
            (word_at(data, start), "cold_start", "reset vector"),
            (word_at(data, start + 2), "warm_start", "nmi vector"),
        ];
        for (target, label, description) in vectors {
            if let Some(target) = target.filter(|&t| meta.is_in_binary(t)) {
                meta.add_entry_point(target, label, description);
            }
        }
        Ok(meta)
    }
}
