//! Per-file disassembly metadata: where the program lives and how to read it.

mod edict;

pub use self::edict::Edict;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::line::Annotations;
use crate::symbols::SymbolTable;
use crate::DisassemblyError;

/// An address where execution is known to be able to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub address: u16,
    pub label: String,
    pub description: String,
}

/// Metadata describing one loaded binary.
///
/// Built once per file by a [`MetaParser`](crate::MetaParser) and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct DisassemblyMeta {
    base_address: u16,
    content_start: usize,
    content_len: usize,
    entry_points: Vec<EntryPoint>,
    edicts: BTreeMap<usize, Edict>,
    annotations: BTreeMap<u16, Annotations>,
    symbols: SymbolTable,
}

impl DisassemblyMeta {
    /// `file_len` is the full file length including any header before `content_start`.
    pub fn new(base_address: u16, content_start: usize, file_len: usize, symbols: SymbolTable) -> Self {
        Self {
            base_address,
            content_start,
            content_len: file_len.saturating_sub(content_start),
            entry_points: Vec::new(),
            edicts: BTreeMap::new(),
            annotations: BTreeMap::new(),
            symbols,
        }
    }

    /// Address of the first content byte.
    pub fn base_address(&self) -> u16 {
        self.base_address
    }

    /// File offset of the first content byte (past any load-address header).
    pub fn content_start_offset(&self) -> usize {
        self.content_start
    }

    pub fn execution_entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn edicts(&self) -> &BTreeMap<usize, Edict> {
        &self.edicts
    }

    pub fn edict_at(&self, offset: usize) -> Option<&Edict> {
        self.edicts.get(&offset)
    }

    /// First edict starting strictly inside `(start, end)`.
    pub fn edict_within(&self, start: usize, end: usize) -> Option<&Edict> {
        if end <= start + 1 {
            return None;
        }
        self.edicts.range(start + 1..end).next().map(|(_, e)| e)
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn annotations_at(&self, address: u16) -> Option<&Annotations> {
        self.annotations.get(&address)
    }

    /// True if `address` falls inside the loaded content.
    pub fn is_in_binary(&self, address: u16) -> bool {
        let address = address as usize;
        let base = self.base_address as usize;
        address >= base && address < base + self.content_len
    }

    /// Map an address inside the binary to its file offset.
    pub fn offset_of(&self, address: u16) -> Option<usize> {
        self.is_in_binary(address)
            .then(|| self.content_start + (address - self.base_address) as usize)
    }

    /// Map a file offset at or past the content start to its load address.
    pub fn address_of(&self, offset: usize) -> u16 {
        (self.base_address as usize + offset.saturating_sub(self.content_start)) as u16
    }

    /// Declare an edict; offsets are unique.
    pub fn add_edict(&mut self, edict: Edict) -> Result<&mut Self, DisassemblyError> {
        let offset = edict.offset();
        if self.edicts.contains_key(&offset) {
            return Err(DisassemblyError::DuplicateEdict(offset));
        }
        self.edicts.insert(offset, edict);
        Ok(self)
    }

    /// Declare an entry point and label its address.
    pub fn add_entry_point(&mut self, address: u16, label: &str, description: &str) -> &mut Self {
        if self.entry_points.iter().any(|e| e.address == address) {
            return self;
        }
        self.annotate(address, Annotations::label(label));
        self.entry_points.push(EntryPoint {
            address,
            label: label.to_string(),
            description: description.to_string(),
        });
        self
    }

    /// Attach predefined labels or comments to an address.
    pub fn annotate(&mut self, address: u16, notes: Annotations) -> &mut Self {
        self.annotations.entry(address).or_default().merge(&notes);
        self
    }
}
