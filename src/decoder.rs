//! Table-driven 6502 instruction decoder.

use std::fmt;

use crate::isa::InstructionSet;
use crate::memory::ByteSource;
use crate::{Decoder, DisassemblyError, FullInstruction};

/// Decodes single instructions through an [`InstructionSet`] table.
#[derive(Debug, Clone, Copy)]
pub struct Mos6502Decoder {
    isa: &'static InstructionSet,
}

impl Mos6502Decoder {
    pub fn new(isa: &'static InstructionSet) -> Self {
        Self { isa }
    }

    /// Decoder for the documented opcodes only.
    pub fn documented() -> Self {
        Self::new(InstructionSet::documented())
    }

    /// Decoder that also accepts undocumented opcodes.
    pub fn undocumented() -> Self {
        Self::new(InstructionSet::nmos_full())
    }

    pub fn instruction_set(&self) -> &'static InstructionSet {
        self.isa
    }
}

impl Default for Mos6502Decoder {
    fn default() -> Self {
        Self::documented()
    }
}

impl fmt::Display for Mos6502Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mos6502Decoder::{}", self.isa.name())
    }
}

impl Decoder for Mos6502Decoder {
    fn decode(&self, memory: &dyn ByteSource, at: usize) -> Result<Option<FullInstruction>, DisassemblyError> {
        let bytes = memory.bytes();
        let opcode = *bytes
            .get(at)
            .ok_or(DisassemblyError::InsufficientBytes { offset: at })?;
        let Some(instruction) = self.isa.instruction(opcode) else {
            return Ok(None);
        };
        let end = at + instruction.length as usize;
        let encoding = bytes
            .get(at..end)
            .ok_or(DisassemblyError::InsufficientBytes { offset: at })?;
        Ok(Some(FullInstruction::new(*instruction, encoding)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Op;
    use crate::memory::{Endian, Memory};

    #[test]
    fn test_decode_lda_absolute() {
        let mem = Memory::from_bytes("t", vec![0xAD, 0x20, 0xD0], Endian::Little);
        let insn = Mos6502Decoder::documented().decode(&mem, 0).unwrap().unwrap();
        assert_eq!(insn.op(), Op::Lda);
        assert_eq!(insn.operand(), 0xD020);
        assert_eq!(insn.len(), 3);
    }

    #[test]
    fn test_illegal_opcode_is_none() {
        let mem = Memory::from_bytes("t", vec![0x02], Endian::Little);
        assert!(Mos6502Decoder::documented().decode(&mem, 0).unwrap().is_none());
        let jam = Mos6502Decoder::undocumented().decode(&mem, 0).unwrap().unwrap();
        assert_eq!(jam.op(), Op::Jam);
    }

    #[test]
    fn test_insufficient_bytes() {
        let mem = Memory::from_bytes("t", vec![0xEA, 0x4C, 0x00], Endian::Little);
        let decoder = Mos6502Decoder::documented();
        assert!(decoder.decode(&mem, 0).is_ok());
        assert!(matches!(
            decoder.decode(&mem, 1),
            Err(DisassemblyError::InsufficientBytes { offset: 1 })
        ));
        assert!(decoder.decode(&mem, 3).is_err());
    }

    #[test]
    fn test_decoder_display() {
        assert_eq!(Mos6502Decoder::documented().to_string(), "Mos6502Decoder::6502");
    }
}
