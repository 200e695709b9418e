//! Bidirectional address/name symbol tables for ROM routines and I/O registers.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::memory::ADDRESS_SPACE;
use crate::DisassemblyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Memory-mapped hardware register.
    Register,
    /// Callable routine.
    Subroutine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub address: u16,
    pub kind: SymbolKind,
    pub description: String,
}

/// Name and address are each unique within a table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    by_address: BTreeMap<u16, Symbol>,
    by_name: HashMap<String, u16>,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(
        &mut self,
        kind: SymbolKind,
        name: &str,
        address: usize,
        description: &str,
    ) -> Result<(), DisassemblyError> {
        if name.trim().is_empty() {
            return Err(DisassemblyError::InvalidSymbol(format!("empty name at ${address:04x}")));
        }
        if address >= ADDRESS_SPACE {
            return Err(DisassemblyError::InvalidSymbol(format!(
                "{name}: address ${address:x} out of range"
            )));
        }
        let address = address as u16;
        if self.by_name.contains_key(name) {
            return Err(DisassemblyError::InvalidSymbol(format!("duplicate name {name}")));
        }
        if let Some(existing) = self.by_address.get(&address) {
            return Err(DisassemblyError::InvalidSymbol(format!(
                "{name}: address ${address:04x} already bound to {}",
                existing.name
            )));
        }
        self.by_name.insert(name.to_string(), address);
        self.by_address.insert(
            address,
            Symbol {
                name: name.to_string(),
                address,
                kind,
                description: description.to_string(),
            },
        );
        Ok(())
    }

    pub fn sub(&mut self, name: &str, address: usize, description: &str) -> Result<(), DisassemblyError> {
        self.add(SymbolKind::Subroutine, name, address, description)
    }

    pub fn reg(&mut self, name: &str, address: usize, description: &str) -> Result<(), DisassemblyError> {
        self.add(SymbolKind::Register, name, address, description)
    }

    pub fn symbol_at(&self, address: u16) -> Option<&Symbol> {
        self.by_address.get(&address)
    }

    pub fn address_of(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    /// Symbols in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.by_address.values()
    }

    fn with_entries(name: &str, subs: &[(&str, usize, &str)], regs: &[(&str, usize, &str)]) -> Self {
        let mut table = Self::new(name);
        for &(n, a, d) in subs {
            // entries are static and distinct
            let _ = table.sub(n, a, d);
        }
        for &(n, a, d) in regs {
            let _ = table.reg(n, a, d);
        }
        table
    }

    /// Commodore 64 kernal jump table plus a few VIC-II/SID/CIA registers.
    pub fn c64_kernal() -> Self {
        Self::with_entries("c64", KERNAL_JUMP_TABLE, C64_REGISTERS)
    }

    /// VIC-20 kernal jump table plus the VIC chip registers most programs touch.
    pub fn vic20_kernal() -> Self {
        Self::with_entries("vic20", KERNAL_JUMP_TABLE, VIC20_REGISTERS)
    }
}

const KERNAL_JUMP_TABLE: &[(&str, usize, &str)] = &[
    ("CINT", 0xFF81, "initialise screen editor"),
    ("IOINIT", 0xFF84, "initialise i/o devices"),
    ("RAMTAS", 0xFF87, "ram test and set pointers"),
    ("RESTOR", 0xFF8A, "restore default i/o vectors"),
    ("VECTOR", 0xFF8D, "read or set i/o vectors"),
    ("SETMSG", 0xFF90, "control kernal messages"),
    ("SECOND", 0xFF93, "send secondary address after listen"),
    ("TKSA", 0xFF96, "send secondary address after talk"),
    ("MEMTOP", 0xFF99, "read or set top of memory"),
    ("MEMBOT", 0xFF9C, "read or set bottom of memory"),
    ("SCNKEY", 0xFF9F, "scan keyboard"),
    ("SETTMO", 0xFFA2, "set serial timeout"),
    ("ACPTR", 0xFFA5, "input byte from serial bus"),
    ("CIOUT", 0xFFA8, "output byte to serial bus"),
    ("UNTLK", 0xFFAB, "command serial bus to untalk"),
    ("UNLSN", 0xFFAE, "command serial bus to unlisten"),
    ("LISTEN", 0xFFB1, "command device to listen"),
    ("TALK", 0xFFB4, "command device to talk"),
    ("READST", 0xFFB7, "read i/o status"),
    ("SETLFS", 0xFFBA, "set logical file parameters"),
    ("SETNAM", 0xFFBD, "set file name"),
    ("OPEN", 0xFFC0, "open logical file"),
    ("CLOSE", 0xFFC3, "close logical file"),
    ("CHKIN", 0xFFC6, "open channel for input"),
    ("CHKOUT", 0xFFC9, "open channel for output"),
    ("CLRCHN", 0xFFCC, "restore default channels"),
    ("CHRIN", 0xFFCF, "input character"),
    ("CHROUT", 0xFFD2, "output character"),
    ("LOAD", 0xFFD5, "load from device"),
    ("SAVE", 0xFFD8, "save to device"),
    ("SETTIM", 0xFFDB, "set jiffy clock"),
    ("RDTIM", 0xFFDE, "read jiffy clock"),
    ("STOP", 0xFFE1, "check stop key"),
    ("GETIN", 0xFFE4, "get character from keyboard buffer"),
    ("CLALL", 0xFFE7, "close all files"),
    ("UDTIM", 0xFFEA, "update jiffy clock"),
    ("SCREEN", 0xFFED, "return screen dimensions"),
    ("PLOT", 0xFFF0, "read or set cursor position"),
    ("IOBASE", 0xFFF3, "return i/o base address"),
];

const C64_REGISTERS: &[(&str, usize, &str)] = &[
    ("VICSCN", 0x0400, "default screen memory"),
    ("SCROLY", 0xD011, "vertical scroll and control"),
    ("RASTER", 0xD012, "raster line"),
    ("VMCSB", 0xD018, "vic memory control"),
    ("VICIRQ", 0xD019, "vic interrupt flags"),
    ("IRQMSK", 0xD01A, "vic interrupt mask"),
    ("EXTCOL", 0xD020, "border colour"),
    ("BGCOL0", 0xD021, "background colour 0"),
    ("SIGVOL", 0xD418, "sid volume and filter mode"),
    ("CIAPRA", 0xDC00, "cia 1 data port a"),
    ("CIAPRB", 0xDC01, "cia 1 data port b"),
    ("CIAICR", 0xDC0D, "cia 1 interrupt control"),
    ("CI2PRA", 0xDD00, "cia 2 data port a"),
];

const VIC20_REGISTERS: &[(&str, usize, &str)] = &[
    ("VICCR0", 0x9000, "horizontal origin"),
    ("VICCR1", 0x9001, "vertical origin"),
    ("VICCR2", 0x9002, "screen columns"),
    ("VICCR3", 0x9003, "screen rows"),
    ("VICCR4", 0x9004, "raster line"),
    ("VICCR5", 0x9005, "screen and character memory"),
    ("VICCRE", 0x900E, "volume and auxiliary colour"),
    ("VICCRF", 0x900F, "screen and border colour"),
    ("D1PRB", 0x9110, "via 1 port b"),
    ("D2PRB", 0x9120, "via 2 port b"),
];
