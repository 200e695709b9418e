//! Sequential disassembly: one pass over the file, front to back.

use std::collections::BTreeMap;

use crate::decoder::Mos6502Decoder;
use crate::line::{Annotations, DataKind, InstructionLike};
use crate::memory::ByteSource;
use crate::meta::DisassemblyMeta;
use crate::symbols::Symbol;
use crate::{Decoder, DisassemblyError, FullInstruction};

/// Stat counter names.
pub const STAT_INSTRUCTIONS: &str = "instructions";
pub const STAT_ILLEGAL_BYTES: &str = "illegal_bytes";
pub const STAT_EDICTS: &str = "edicts";
pub const STAT_DEGRADED_TRAILING: &str = "degraded_trailing";
pub const STAT_DEGRADED_OVERLAP: &str = "degraded_overlap";
pub const STAT_EDICT_OVERFLOW: &str = "edict_overflow";
pub const STAT_DEGRADED_EMPTY: &str = "degraded_empty";

/// Walks a file from its content start to the end, yielding listing lines.
///
/// The cursor only moves forward. Edicts take precedence over opcode
/// decoding and no instruction is allowed to straddle one. Anything that
/// cannot be decoded becomes a byte declaration, so every content byte is
/// accounted for exactly once.
///
/// [`Disassembler::disassemble1`] is independent of the cursor; the tracer
/// uses it (through the [`Decoder`] impl) to decode anywhere in an address
/// space.
pub struct Disassembler<'a> {
    source: &'a (dyn ByteSource + Sync),
    meta: &'a DisassemblyMeta,
    decoder: Mos6502Decoder,
    original_start: usize,
    cursor: usize,
    pc_emitted: bool,
    stats: BTreeMap<String, usize>,
    symbol_definitions: BTreeMap<u16, Symbol>,
}

impl<'a> Disassembler<'a> {
    pub fn new(source: &'a (dyn ByteSource + Sync), meta: &'a DisassemblyMeta) -> Self {
        Self::with_decoder(source, meta, Mos6502Decoder::documented())
    }

    pub fn with_decoder(
        source: &'a (dyn ByteSource + Sync),
        meta: &'a DisassemblyMeta,
        decoder: Mos6502Decoder,
    ) -> Self {
        let original_start = meta.content_start_offset();
        Self {
            source,
            meta,
            decoder,
            original_start,
            cursor: original_start,
            pc_emitted: false,
            stats: BTreeMap::new(),
            symbol_definitions: BTreeMap::new(),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn meta(&self) -> &DisassemblyMeta {
        self.meta
    }

    pub fn decoder(&self) -> &Mos6502Decoder {
        &self.decoder
    }

    pub fn has_next(&self) -> bool {
        !self.pc_emitted || self.cursor < self.source.len()
    }

    /// Load address of the byte under the cursor.
    pub fn current_address(&self) -> u16 {
        (self.meta.base_address() as usize)
            .wrapping_add(self.cursor.saturating_sub(self.original_start)) as u16
    }

    pub fn is_in_binary(&self, address: u16) -> bool {
        self.meta.is_in_binary(address)
    }

    /// Symbol for `address` from the metadata's table or one recorded on this pass.
    pub fn get_symbol(&self, address: u16) -> Option<&Symbol> {
        self.meta
            .symbol_table()
            .symbol_at(address)
            .or_else(|| self.symbol_definitions.get(&address))
    }

    /// Record a symbol the listing needs to define; first definition wins.
    pub fn add_symbol_definition(&mut self, symbol: Symbol) {
        self.symbol_definitions.entry(symbol.address).or_insert(symbol);
    }

    pub fn symbol_definitions(&self) -> impl Iterator<Item = &Symbol> {
        self.symbol_definitions.values()
    }

    /// Symbol definitions recorded so far, as listing lines.
    pub fn symbol_definition_lines(&self) -> Vec<InstructionLike> {
        self.symbol_definitions
            .values()
            .cloned()
            .map(InstructionLike::SymbolDefinition)
            .collect()
    }

    pub fn add_stat(&mut self, name: &str, count: usize) {
        *self.stats.entry(name.to_string()).or_default() += count;
    }

    pub fn stats(&self) -> &BTreeMap<String, usize> {
        &self.stats
    }

    pub fn segment_base_address(&self) -> u16 {
        self.meta.base_address()
    }

    /// File bytes from the content start on, header excluded.
    pub fn content_bytes(&self) -> &[u8] {
        self.source.bytes().get(self.original_start..).unwrap_or(&[])
    }

    /// Decode one instruction at `offset` of `memory` without touching the cursor.
    pub fn disassemble1(
        &self,
        memory: &dyn ByteSource,
        offset: usize,
    ) -> Result<Option<FullInstruction>, DisassemblyError> {
        self.decoder.decode(memory, offset)
    }

    /// Labels and comments for `address`: predefined notes, then symbol names.
    fn notes_at(&self, address: u16) -> Annotations {
        let mut notes = self.meta.annotations_at(address).cloned().unwrap_or_default();
        if let Some(symbol) = self.meta.symbol_table().symbol_at(address) {
            notes.merge(&Annotations::label(symbol.name.clone()));
        }
        notes
    }

    /// Consume `len` bytes at the cursor as a byte declaration.
    fn declare_bytes(&mut self, address: u16, len: usize, notes: Annotations) -> InstructionLike {
        let end = (self.cursor + len).min(self.source.len());
        let bytes = self.source.bytes()[self.cursor..end].to_vec();
        self.cursor = end;
        InstructionLike::Data {
            address,
            kind: DataKind::Bytes,
            bytes,
            notes,
        }
    }

    /// Offset of the first edict after the cursor, or the end of the file.
    fn next_edict_or_end(&self) -> usize {
        let end = self.source.len();
        self.meta.edict_within(self.cursor, end).map_or(end, |e| e.offset())
    }

    pub fn next_instruction_line(&mut self) -> Option<InstructionLike> {
        if !self.pc_emitted {
            self.pc_emitted = true;
            log::debug!(
                "Disassembling {} ({} bytes from offset {}) at ${:04x}",
                self.source.name(),
                self.source.len().saturating_sub(self.original_start),
                self.original_start,
                self.meta.base_address()
            );
            return Some(InstructionLike::PcAssignment {
                address: self.meta.base_address(),
            });
        }

        let source = self.source;
        let meta = self.meta;
        let len = source.len();
        if self.cursor >= len {
            return None;
        }
        let address = self.current_address();
        let notes = self.notes_at(address);

        if let Some(edict) = meta.edict_at(self.cursor) {
            if let Some(line) = edict.create(source.bytes(), address, &notes) {
                self.cursor = edict.end();
                self.add_stat(STAT_EDICTS, 1);
                return Some(line);
            }
            let remaining = len - self.cursor;
            log::warn!(
                "edict at offset {} needs {} bytes but only {} remain",
                edict.offset(),
                edict.length(),
                remaining
            );
            let mut notes = notes.with_comment(edict.overflow_comment(remaining));
            notes.merge(edict.notes());
            self.add_stat(STAT_EDICT_OVERFLOW, 1);
            return Some(self.declare_bytes(address, remaining, notes));
        }

        let isa = self.decoder.instruction_set();
        let bytes = source.bytes();
        let opcode = bytes[self.cursor];

        let Some(instruction) = isa.instruction(opcode) else {
            let stop = self.next_edict_or_end();
            let run = bytes[self.cursor..stop]
                .iter()
                .take_while(|&&b| !isa.is_legal(b))
                .count();
            let comment = if run == 1 {
                "illegal opcode".to_string()
            } else {
                format!("{run} illegal opcodes")
            };
            self.add_stat(STAT_ILLEGAL_BYTES, run);
            return Some(self.declare_bytes(address, run, notes.with_comment(comment)));
        };

        if instruction.length == 0 {
            // nothing to consume; keep the cursor moving
            let comment = format!("{} has no encoded length", instruction.op);
            self.add_stat(STAT_DEGRADED_EMPTY, 1);
            return Some(self.declare_bytes(address, 1, notes.with_comment(comment)));
        }

        let end = self.cursor + instruction.length as usize;
        if end > len {
            let stop = self.next_edict_or_end();
            let comment = format!(
                "{} needs {} bytes, only {} remain",
                instruction.op,
                instruction.length,
                len - self.cursor
            );
            self.add_stat(STAT_DEGRADED_TRAILING, 1);
            return Some(self.declare_bytes(address, stop - self.cursor, notes.with_comment(comment)));
        }

        if let Some(inner) = meta.edict_within(self.cursor, end) {
            let comment = format!("{} would overlap edict at offset {}", instruction.op, inner.offset());
            let run = inner.offset() - self.cursor;
            self.add_stat(STAT_DEGRADED_OVERLAP, 1);
            return Some(self.declare_bytes(address, run, notes.with_comment(comment)));
        }

        let full = FullInstruction::new(*instruction, &bytes[self.cursor..end]);
        self.cursor = end;
        self.add_stat(STAT_INSTRUCTIONS, 1);
        if let Some(target) = full.operand_address(address) {
            if !meta.is_in_binary(target) {
                if let Some(symbol) = meta.symbol_table().symbol_at(target) {
                    self.add_symbol_definition(symbol.clone());
                }
            }
        }
        if self.cursor >= len {
            log::debug!("Disassembly of {} complete: {:?}", self.source.name(), self.stats);
        }
        Some(InstructionLike::Instruction {
            address,
            instruction: full,
            notes,
        })
    }
}

impl Iterator for Disassembler<'_> {
    type Item = InstructionLike;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_instruction_line()
    }
}

impl Decoder for Disassembler<'_> {
    fn decode(&self, memory: &dyn ByteSource, at: usize) -> Result<Option<FullInstruction>, DisassemblyError> {
        self.disassemble1(memory, at)
    }
}

/// Disassemble all of `source`, symbol definitions first.
pub fn run(source: &(dyn ByteSource + Sync), meta: &DisassemblyMeta) -> Vec<InstructionLike> {
    let mut disassembler = Disassembler::new(source, meta);
    let body: Vec<InstructionLike> = disassembler.by_ref().collect();
    let mut lines = disassembler.symbol_definition_lines();
    lines.extend(body);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{AddressingMode, Cycles, InstructionSet, Op, Penalty};
    use crate::memory::{Endian, Memory};
    use crate::meta::Edict;
    use crate::symbols::SymbolTable;
    use rstest::rstest;

    fn prg(bytes: &[u8]) -> (Memory, DisassemblyMeta) {
        let base = u16::from_le_bytes([bytes[0], bytes[1]]);
        let meta = DisassemblyMeta::new(base, 2, bytes.len(), SymbolTable::c64_kernal());
        (Memory::from_bytes("test.prg", bytes.to_vec(), Endian::Little), meta)
    }

    fn total_len(lines: &[InstructionLike]) -> usize {
        lines.iter().map(InstructionLike::len).sum()
    }

    #[test]
    fn test_pc_assignment_comes_first() {
        let (file, meta) = prg(&[0x00, 0xC0, 0xEA]);
        let lines: Vec<_> = Disassembler::new(&file, &meta).collect();
        assert_eq!(lines[0], InstructionLike::PcAssignment { address: 0xC000 });
        assert_eq!(lines[1].as_instruction().map(FullInstruction::op), Some(Op::Nop));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_current_address_tracks_cursor() {
        let (file, meta) = prg(&[0x01, 0x08, 0xA9, 0x01, 0x60]);
        let mut dis = Disassembler::new(&file, &meta);
        assert_eq!(dis.current_address(), 0x0801);
        dis.next_instruction_line();
        dis.next_instruction_line();
        assert_eq!(dis.current_address(), 0x0803);
        assert!(dis.has_next());
        dis.next_instruction_line();
        assert!(!dis.has_next());
    }

    #[rstest]
    #[case(&[0x00, 0x10, 0xEA, 0x02, 0x03, 0x04, 0xEA], 3)]
    #[case(&[0x00, 0x10, 0x02], 1)]
    #[case(&[0x00, 0x10, 0xEA, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62], 6)]
    fn test_illegal_run_coalesces(#[case] bytes: &[u8], #[case] run: usize) {
        let (file, meta) = prg(bytes);
        let mut dis = Disassembler::new(&file, &meta);
        let lines: Vec<_> = dis.by_ref().collect();
        let data: Vec<_> = lines
            .iter()
            .filter(|l| matches!(l, InstructionLike::Data { .. }))
            .collect();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].len(), run);
        assert_eq!(dis.stats()[STAT_ILLEGAL_BYTES], run);
    }

    #[test]
    fn test_illegal_run_stops_at_edict() {
        let (file, mut meta) = prg(&[0x00, 0x10, 0x02, 0x03, 0x04, 0x05]);
        meta.add_edict(Edict::text(4, 2, Annotations::default())).unwrap();
        let lines: Vec<_> = Disassembler::new(&file, &meta).collect();
        assert_eq!(lines[1].len(), 2);
        assert!(matches!(lines[2], InstructionLike::Data { kind: DataKind::Text, .. }));
    }

    #[test]
    fn test_truncated_trailing_instruction() {
        let (file, meta) = prg(&[0x00, 0x10, 0xEA, 0x4C, 0x00]);
        let mut dis = Disassembler::new(&file, &meta);
        let lines: Vec<_> = dis.by_ref().collect();
        let last = lines.last().unwrap();
        assert!(matches!(last, InstructionLike::Data { kind: DataKind::Bytes, .. }));
        assert_eq!(last.bytes(), &[0x4C, 0x00]);
        assert!(last.notes().unwrap().comments[0].contains("JMP"));
        assert_eq!(dis.stats()[STAT_DEGRADED_TRAILING], 1);
    }

    #[test]
    fn test_edict_wins_over_opcode() {
        // JMP $1234 would otherwise decode here
        let (file, mut meta) = prg(&[0x00, 0x10, 0x4C, 0x34, 0x00, 0xEA]);
        meta.add_edict(Edict::words(2, 1, Annotations::label("vector"))).unwrap();
        let lines: Vec<_> = Disassembler::new(&file, &meta).collect();
        match &lines[1] {
            InstructionLike::Data { kind, bytes, notes, .. } => {
                assert_eq!(*kind, DataKind::Words);
                assert_eq!(bytes, &vec![0x4C, 0x34]);
                assert_eq!(notes.labels, vec!["vector"]);
            }
            other => panic!("expected data, got {other:?}"),
        }
        assert_eq!(lines[2].as_instruction().map(FullInstruction::op), Some(Op::Brk));
    }

    #[test]
    fn test_instruction_never_straddles_edict() {
        let (file, mut meta) = prg(&[0x00, 0x10, 0xEA, 0xAD, 0x20, 0xD0, 0x60]);
        meta.add_edict(Edict::bytes(5, 2, Annotations::default())).unwrap();
        let mut dis = Disassembler::new(&file, &meta);
        let lines: Vec<_> = dis.by_ref().collect();
        assert_eq!(lines[2].bytes(), &[0xAD, 0x20]);
        assert!(lines[2].notes().unwrap().comments[0].contains("overlap"));
        assert_eq!(lines[3].bytes(), &[0xD0, 0x60]);
        assert_eq!(dis.stats()[STAT_DEGRADED_OVERLAP], 1);
        assert_eq!(total_len(&lines), 5);
    }

    #[test]
    fn test_edict_overflow_consumes_rest() {
        let (file, mut meta) = prg(&[0x00, 0x10, 0xEA, 0x01, 0x02]);
        meta.add_edict(Edict::text(3, 10, Annotations::label("title").with_comment("name")))
            .unwrap();
        let mut dis = Disassembler::new(&file, &meta);
        let lines: Vec<_> = dis.by_ref().collect();
        let last = lines.last().unwrap();
        assert_eq!(last.bytes(), &[0x01, 0x02]);
        let notes = last.notes().unwrap();
        assert_eq!(notes.labels, vec!["title"]);
        assert!(notes.comments.iter().any(|c| c.contains("only 2 bytes remain")));
        assert!(notes.comments.contains(&"name".to_string()));
        assert_eq!(dis.stats()[STAT_EDICT_OVERFLOW], 1);
    }

    #[test]
    fn test_external_symbols_are_recorded() {
        // JSR CHROUT, STA $D020, RTS
        let (file, meta) = prg(&[0x00, 0xC0, 0x20, 0xD2, 0xFF, 0x8D, 0x20, 0xD0, 0x60]);
        let mut dis = Disassembler::new(&file, &meta);
        dis.by_ref().for_each(drop);
        let names: Vec<_> = dis.symbol_definitions().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["EXTCOL", "CHROUT"]);
        assert_eq!(dis.get_symbol(0xFFD2).map(|s| s.name.as_str()), Some("CHROUT"));
    }

    #[test]
    fn test_run_prepends_symbol_definitions() {
        let (file, meta) = prg(&[0x00, 0xC0, 0x20, 0xD2, 0xFF, 0x60]);
        let lines = run(&file, &meta);
        assert!(matches!(lines[0], InstructionLike::SymbolDefinition(_)));
        assert_eq!(lines[1], InstructionLike::PcAssignment { address: 0xC000 });
    }

    #[test]
    fn test_content_bytes_skip_header() {
        let (file, meta) = prg(&[0x00, 0xC0, 0xEA, 0x60]);
        let dis = Disassembler::new(&file, &meta);
        assert_eq!(dis.content_bytes(), &[0xEA, 0x60]);
        assert_eq!(dis.segment_base_address(), 0xC000);
    }

    #[test]
    fn test_disassemble1_ignores_cursor() {
        let (file, meta) = prg(&[0x00, 0xC0, 0xEA]);
        let dis = Disassembler::new(&file, &meta);
        let space = Memory::from_bytes("space", vec![0xEA, 0x00, 0x00, 0x4C], Endian::Little);
        let brk = dis.disassemble1(&space, 1).unwrap().unwrap();
        assert_eq!(brk.op(), Op::Brk);
        assert!(matches!(
            dis.disassemble1(&space, 3),
            Err(DisassemblyError::InsufficientBytes { offset: 3 })
        ));
        assert_eq!(dis.current_address(), 0xC000);
    }

    #[test]
    fn test_zero_length_opcode_still_advances() {
        let mut set = InstructionSet::new("zero-length nop");
        set.add(0xEA, Op::Nop, AddressingMode::Implied, 0, Cycles { base: 2, penalty: Penalty::None })
            .unwrap();
        let decoder = Mos6502Decoder::new(Box::leak(Box::new(set)));
        let (file, meta) = prg(&[0x00, 0x10, 0xEA, 0xEA]);
        let mut dis = Disassembler::with_decoder(&file, &meta, decoder);
        let lines: Vec<_> = dis.by_ref().take(10).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(total_len(&lines), 2);
        assert!(lines[1].notes().unwrap().comments[0].contains("no encoded length"));
        assert_eq!(dis.stats()[STAT_DEGRADED_EMPTY], 2);
    }
}
