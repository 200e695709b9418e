//! Disassembly strategies

use std::collections::BTreeSet;
use std::fmt;

use clap::ValueEnum;

use crate::decoder::Mos6502Decoder;
use crate::memory::{ByteSource, Memory};
use crate::meta::DisassemblyMeta;
use crate::{DisassemblyError, InstructionLike};

pub mod linear;
pub mod trace;

pub use self::linear::Disassembler;
pub use self::trace::{HaltReason, Thread, Tracer, TracerOptions};

/// Default step bound for [`Strategy::Trace`].
pub const DEFAULT_MAX_STEPS: usize = 100_000;

/// Available disassembly strategies.
#[derive(Copy, Clone, ValueEnum, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Linear listing of the whole file
    #[default]
    Linear,
    /// Linear listing plus a static trace from the entry points
    Trace,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Linear => write!(f, "Linear sweep"),
            Strategy::Trace => write!(f, "Static trace"),
        }
    }
}

/// Output of one [`Strategy::run`].
#[derive(Debug, Clone)]
pub struct Listing {
    /// Symbol definitions followed by the file's lines.
    pub lines: Vec<InstructionLike>,
    /// Addresses reached by the tracer, if it ran.
    pub executed: Option<BTreeSet<u16>>,
    pub report: Option<crate::format::TraceReport>,
}

impl Listing {
    /// True if the tracer ran and reached `address`.
    pub fn is_executed(&self, address: u16) -> bool {
        self.executed.as_ref().is_some_and(|e| e.contains(&address))
    }
}

impl Strategy {
    /// Run the selected strategy on `source` as described by `meta`.
    pub fn run(
        &self,
        source: &(dyn ByteSource + Sync),
        meta: &DisassemblyMeta,
        decoder: Mos6502Decoder,
        options: TracerOptions,
    ) -> Result<Listing, DisassemblyError> {
        let mut disassembler = Disassembler::with_decoder(source, meta, decoder);
        let body: Vec<InstructionLike> = disassembler.by_ref().collect();
        let mut lines = disassembler.symbol_definition_lines();
        lines.extend(body);

        match self {
            Strategy::Linear => Ok(Listing {
                lines,
                executed: None,
                report: None,
            }),
            Strategy::Trace => {
                let space = load_binary(source, meta)?;
                let entries: Vec<u16> = meta.execution_entry_points().iter().map(|e| e.address).collect();
                let mut tracer = Tracer::with_options(&disassembler, &space, &entries, options)?;
                tracer.trace(DEFAULT_MAX_STEPS);
                let report = crate::format::TraceReport::from_tracer(&tracer);
                Ok(Listing {
                    lines,
                    executed: Some(tracer.executed_addresses()),
                    report: Some(report),
                })
            }
        }
    }

    /// Return all available strategies
    pub fn all() -> &'static [Strategy] {
        &[Strategy::Linear, Strategy::Trace]
    }
}

/// A 64 KiB executable address space holding the file's content at its base address.
pub fn load_binary(source: &dyn ByteSource, meta: &DisassemblyMeta) -> Result<Memory, DisassemblyError> {
    let content = source.bytes().get(meta.content_start_offset()..).unwrap_or(&[]);
    let mut space = Memory::address_space(source.name());
    space.load(content, meta.base_address() as usize)?;
    Ok(space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Endian;
    use crate::parser::PrgParser;
    use crate::MetaParser;

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Linear.to_string(), "Linear sweep");
        assert_eq!(Strategy::Trace.to_string(), "Static trace");
        assert_eq!(Strategy::all().len(), 2);
    }

    #[test]
    fn test_load_binary_places_content() {
        let bytes = vec![0x00, 0xC0, 0xA9, 0x01, 0x60];
        let meta = PrgParser::c64().parse(&bytes).unwrap();
        let file = Memory::from_bytes("t.prg", bytes, Endian::Little);
        let space = load_binary(&file, &meta).unwrap();
        assert_eq!(space.len(), 0x1_0000);
        assert_eq!(space.read8(0xC000).unwrap(), 0xA9);
        assert_eq!(space.read8(0xC002).unwrap(), 0x60);
        assert!(space.is_executable());
    }

    #[test]
    fn test_load_binary_overflow() {
        let mut bytes = vec![0xF0, 0xFF];
        bytes.extend([0xEA; 0x20]);
        let meta = PrgParser::c64().parse(&bytes).unwrap();
        let file = Memory::from_bytes("t.prg", bytes, Endian::Little);
        assert!(matches!(
            load_binary(&file, &meta),
            Err(DisassemblyError::Overflow { .. })
        ));
    }

    #[test]
    fn test_trace_strategy_marks_executed() {
        // LDA #$01 / BEQ +1 / RTS / BRK
        let bytes = vec![0x00, 0xC0, 0xA9, 0x01, 0xF0, 0x01, 0x60, 0x00];
        let meta = PrgParser::c64().parse(&bytes).unwrap();
        let file = Memory::from_bytes("t.prg", bytes, Endian::Little);
        let decoder = Mos6502Decoder::documented();

        let linear = Strategy::Linear.run(&file, &meta, decoder, TracerOptions::default()).unwrap();
        assert!(linear.executed.is_none());

        let traced = Strategy::Trace.run(&file, &meta, decoder, TracerOptions::default()).unwrap();
        assert_eq!(traced.lines, linear.lines);
        assert!(traced.is_executed(0xC004));
        assert!(traced.is_executed(0xC005));
        assert!(!traced.is_executed(0xC003));
        assert!(traced.report.unwrap().complete);
    }
}
