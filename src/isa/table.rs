//! Opcode table mapping each of the 256 opcode bytes to an [`Instruction`].

use std::sync::OnceLock;

use serde::Serialize;

use super::{AddressingMode, Op};
use crate::DisassemblyError;

/// Extra cycles an instruction may cost on top of its base count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    None,
    /// +1 when indexing crosses a page boundary.
    PageCross,
    /// +1 when taken, +1 more when the target is on another page.
    Branch,
}

/// Cycle-cost rule. Bookkeeping only; never affects control flow analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cycles {
    pub base: u8,
    pub penalty: Penalty,
}

impl Cycles {
    /// Worst-case cycle count.
    pub fn max(&self) -> u8 {
        match self.penalty {
            Penalty::None => self.base,
            Penalty::PageCross => self.base + 1,
            Penalty::Branch => self.base + 2,
        }
    }
}

/// One opcode's definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub opcode: u8,
    pub op: Op,
    pub mode: AddressingMode,
    /// Encoded length including the opcode byte.
    pub length: u8,
    pub cycles: Cycles,
}

/// Lookup table from opcode byte to instruction; unmapped opcodes are illegal.
#[derive(Debug, Clone)]
pub struct InstructionSet {
    name: &'static str,
    table: [Option<Instruction>; 256],
}

impl InstructionSet {
    pub fn new(name: &'static str) -> Self {
        Self { name, table: [None; 256] }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register an opcode. Each opcode may be registered only once.
    pub fn add(
        &mut self,
        opcode: u8,
        op: Op,
        mode: AddressingMode,
        length: u8,
        cycles: Cycles,
    ) -> Result<(), DisassemblyError> {
        if length > 3 {
            return Err(DisassemblyError::InvalidLength { opcode, length });
        }
        let slot = &mut self.table[opcode as usize];
        if slot.is_some() {
            return Err(DisassemblyError::DuplicateOpcode(opcode));
        }
        *slot = Some(Instruction { opcode, op, mode, length, cycles });
        Ok(())
    }

    /// Instruction for `opcode`, or `None` if the opcode is illegal in this set.
    pub fn instruction(&self, opcode: u8) -> Option<&Instruction> {
        self.table[opcode as usize].as_ref()
    }

    /// Encoded length; illegal opcodes count as one byte so decoding can advance.
    pub fn num_bytes(&self, opcode: u8) -> usize {
        self.instruction(opcode).map_or(1, |i| i.length as usize)
    }

    pub fn is_legal(&self, opcode: u8) -> bool {
        self.table[opcode as usize].is_some()
    }

    /// All defined instructions, in opcode order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.table.iter().flatten()
    }

    /// All instructions with the given mnemonic, case-insensitively.
    pub fn by_name(&self, mnemonic: &str) -> Vec<&Instruction> {
        self.instructions()
            .filter(|i| i.op.mnemonic().eq_ignore_ascii_case(mnemonic))
            .collect()
    }

    /// The instruction with the given mnemonic and mode, preferring documented encodings.
    pub fn by_name_and_mode(&self, mnemonic: &str, mode: AddressingMode) -> Option<&Instruction> {
        self.by_name(mnemonic)
            .into_iter()
            .filter(|i| i.mode == mode)
            .min_by_key(|i| (i.op.is_illegal(), i.opcode))
    }

    fn from_entries(name: &'static str, tables: &[&[Entry]]) -> Result<Self, DisassemblyError> {
        let mut set = Self::new(name);
        for &(opcode, op, mode, base, penalty) in tables.iter().flat_map(|t| t.iter()) {
            let length = 1 + mode.operand_bytes();
            set.add(opcode, op, mode, length, Cycles { base, penalty })?;
        }
        Ok(set)
    }

    /// The 151 documented NMOS 6502 opcodes.
    pub fn documented() -> &'static InstructionSet {
        static SET: OnceLock<InstructionSet> = OnceLock::new();
        SET.get_or_init(|| {
            Self::from_entries("6502", &[DOCUMENTED]).expect("well-formed documented opcode table")
        })
    }

    /// Documented plus undocumented opcodes; every opcode byte is defined.
    pub fn nmos_full() -> &'static InstructionSet {
        static SET: OnceLock<InstructionSet> = OnceLock::new();
        SET.get_or_init(|| {
            Self::from_entries("6502-undocumented", &[DOCUMENTED, UNDOCUMENTED])
                .expect("well-formed undocumented opcode table")
        })
    }
}

type Entry = (u8, Op, AddressingMode, u8, Penalty);

use AddressingMode::{
    Absolute as ABS, AbsoluteX as ABX, AbsoluteY as ABY, Accumulator as ACC, Immediate as IMM,
    Implied as IMP, IndexedIndirect as IZX, Indirect as IND, IndirectIndexed as IZY,
    Relative as REL, ZeroPage as ZP, ZeroPageX as ZPX, ZeroPageY as ZPY,
};
use Penalty::{Branch as B, None as N, PageCross as P};

#[rustfmt::skip]
const DOCUMENTED: &[Entry] = &[
    (0x00, Op::Brk, IMP, 7, N), (0x01, Op::Ora, IZX, 6, N), (0x05, Op::Ora, ZP, 3, N),
    (0x06, Op::Asl, ZP, 5, N), (0x08, Op::Php, IMP, 3, N), (0x09, Op::Ora, IMM, 2, N),
    (0x0A, Op::Asl, ACC, 2, N), (0x0D, Op::Ora, ABS, 4, N), (0x0E, Op::Asl, ABS, 6, N),
    (0x10, Op::Bpl, REL, 2, B), (0x11, Op::Ora, IZY, 5, P), (0x15, Op::Ora, ZPX, 4, N),
    (0x16, Op::Asl, ZPX, 6, N), (0x18, Op::Clc, IMP, 2, N), (0x19, Op::Ora, ABY, 4, P),
    (0x1D, Op::Ora, ABX, 4, P), (0x1E, Op::Asl, ABX, 7, N),
    (0x20, Op::Jsr, ABS, 6, N), (0x21, Op::And, IZX, 6, N), (0x24, Op::Bit, ZP, 3, N),
    (0x25, Op::And, ZP, 3, N), (0x26, Op::Rol, ZP, 5, N), (0x28, Op::Plp, IMP, 4, N),
    (0x29, Op::And, IMM, 2, N), (0x2A, Op::Rol, ACC, 2, N), (0x2C, Op::Bit, ABS, 4, N),
    (0x2D, Op::And, ABS, 4, N), (0x2E, Op::Rol, ABS, 6, N),
    (0x30, Op::Bmi, REL, 2, B), (0x31, Op::And, IZY, 5, P), (0x35, Op::And, ZPX, 4, N),
    (0x36, Op::Rol, ZPX, 6, N), (0x38, Op::Sec, IMP, 2, N), (0x39, Op::And, ABY, 4, P),
    (0x3D, Op::And, ABX, 4, P), (0x3E, Op::Rol, ABX, 7, N),
    (0x40, Op::Rti, IMP, 6, N), (0x41, Op::Eor, IZX, 6, N), (0x45, Op::Eor, ZP, 3, N),
    (0x46, Op::Lsr, ZP, 5, N), (0x48, Op::Pha, IMP, 3, N), (0x49, Op::Eor, IMM, 2, N),
    (0x4A, Op::Lsr, ACC, 2, N), (0x4C, Op::Jmp, ABS, 3, N), (0x4D, Op::Eor, ABS, 4, N),
    (0x4E, Op::Lsr, ABS, 6, N),
    (0x50, Op::Bvc, REL, 2, B), (0x51, Op::Eor, IZY, 5, P), (0x55, Op::Eor, ZPX, 4, N),
    (0x56, Op::Lsr, ZPX, 6, N), (0x58, Op::Cli, IMP, 2, N), (0x59, Op::Eor, ABY, 4, P),
    (0x5D, Op::Eor, ABX, 4, P), (0x5E, Op::Lsr, ABX, 7, N),
    (0x60, Op::Rts, IMP, 6, N), (0x61, Op::Adc, IZX, 6, N), (0x65, Op::Adc, ZP, 3, N),
    (0x66, Op::Ror, ZP, 5, N), (0x68, Op::Pla, IMP, 4, N), (0x69, Op::Adc, IMM, 2, N),
    (0x6A, Op::Ror, ACC, 2, N), (0x6C, Op::Jmp, IND, 5, N), (0x6D, Op::Adc, ABS, 4, N),
    (0x6E, Op::Ror, ABS, 6, N),
    (0x70, Op::Bvs, REL, 2, B), (0x71, Op::Adc, IZY, 5, P), (0x75, Op::Adc, ZPX, 4, N),
    (0x76, Op::Ror, ZPX, 6, N), (0x78, Op::Sei, IMP, 2, N), (0x79, Op::Adc, ABY, 4, P),
    (0x7D, Op::Adc, ABX, 4, P), (0x7E, Op::Ror, ABX, 7, N),
    (0x81, Op::Sta, IZX, 6, N), (0x84, Op::Sty, ZP, 3, N), (0x85, Op::Sta, ZP, 3, N),
    (0x86, Op::Stx, ZP, 3, N), (0x88, Op::Dey, IMP, 2, N), (0x8A, Op::Txa, IMP, 2, N),
    (0x8C, Op::Sty, ABS, 4, N), (0x8D, Op::Sta, ABS, 4, N), (0x8E, Op::Stx, ABS, 4, N),
    (0x90, Op::Bcc, REL, 2, B), (0x91, Op::Sta, IZY, 6, N), (0x94, Op::Sty, ZPX, 4, N),
    (0x95, Op::Sta, ZPX, 4, N), (0x96, Op::Stx, ZPY, 4, N), (0x98, Op::Tya, IMP, 2, N),
    (0x99, Op::Sta, ABY, 5, N), (0x9A, Op::Txs, IMP, 2, N), (0x9D, Op::Sta, ABX, 5, N),
    (0xA0, Op::Ldy, IMM, 2, N), (0xA1, Op::Lda, IZX, 6, N), (0xA2, Op::Ldx, IMM, 2, N),
    (0xA4, Op::Ldy, ZP, 3, N), (0xA5, Op::Lda, ZP, 3, N), (0xA6, Op::Ldx, ZP, 3, N),
    (0xA8, Op::Tay, IMP, 2, N), (0xA9, Op::Lda, IMM, 2, N), (0xAA, Op::Tax, IMP, 2, N),
    (0xAC, Op::Ldy, ABS, 4, N), (0xAD, Op::Lda, ABS, 4, N), (0xAE, Op::Ldx, ABS, 4, N),
    (0xB0, Op::Bcs, REL, 2, B), (0xB1, Op::Lda, IZY, 5, P), (0xB4, Op::Ldy, ZPX, 4, N),
    (0xB5, Op::Lda, ZPX, 4, N), (0xB6, Op::Ldx, ZPY, 4, N), (0xB8, Op::Clv, IMP, 2, N),
    (0xB9, Op::Lda, ABY, 4, P), (0xBA, Op::Tsx, IMP, 2, N), (0xBC, Op::Ldy, ABX, 4, P),
    (0xBD, Op::Lda, ABX, 4, P), (0xBE, Op::Ldx, ABY, 4, P),
    (0xC0, Op::Cpy, IMM, 2, N), (0xC1, Op::Cmp, IZX, 6, N), (0xC4, Op::Cpy, ZP, 3, N),
    (0xC5, Op::Cmp, ZP, 3, N), (0xC6, Op::Dec, ZP, 5, N), (0xC8, Op::Iny, IMP, 2, N),
    (0xC9, Op::Cmp, IMM, 2, N), (0xCA, Op::Dex, IMP, 2, N), (0xCC, Op::Cpy, ABS, 4, N),
    (0xCD, Op::Cmp, ABS, 4, N), (0xCE, Op::Dec, ABS, 6, N),
    (0xD0, Op::Bne, REL, 2, B), (0xD1, Op::Cmp, IZY, 5, P), (0xD5, Op::Cmp, ZPX, 4, N),
    (0xD6, Op::Dec, ZPX, 6, N), (0xD8, Op::Cld, IMP, 2, N), (0xD9, Op::Cmp, ABY, 4, P),
    (0xDD, Op::Cmp, ABX, 4, P), (0xDE, Op::Dec, ABX, 7, N),
    (0xE0, Op::Cpx, IMM, 2, N), (0xE1, Op::Sbc, IZX, 6, N), (0xE4, Op::Cpx, ZP, 3, N),
    (0xE5, Op::Sbc, ZP, 3, N), (0xE6, Op::Inc, ZP, 5, N), (0xE8, Op::Inx, IMP, 2, N),
    (0xE9, Op::Sbc, IMM, 2, N), (0xEA, Op::Nop, IMP, 2, N), (0xEC, Op::Cpx, ABS, 4, N),
    (0xED, Op::Sbc, ABS, 4, N), (0xEE, Op::Inc, ABS, 6, N),
    (0xF0, Op::Beq, REL, 2, B), (0xF1, Op::Sbc, IZY, 5, P), (0xF5, Op::Sbc, ZPX, 4, N),
    (0xF6, Op::Inc, ZPX, 6, N), (0xF8, Op::Sed, IMP, 2, N), (0xF9, Op::Sbc, ABY, 4, P),
    (0xFD, Op::Sbc, ABX, 4, P), (0xFE, Op::Inc, ABX, 7, N),
];

#[rustfmt::skip]
const UNDOCUMENTED: &[Entry] = &[
    (0x02, Op::Jam, IMP, 0, N), (0x12, Op::Jam, IMP, 0, N), (0x22, Op::Jam, IMP, 0, N),
    (0x32, Op::Jam, IMP, 0, N), (0x42, Op::Jam, IMP, 0, N), (0x52, Op::Jam, IMP, 0, N),
    (0x62, Op::Jam, IMP, 0, N), (0x72, Op::Jam, IMP, 0, N), (0x92, Op::Jam, IMP, 0, N),
    (0xB2, Op::Jam, IMP, 0, N), (0xD2, Op::Jam, IMP, 0, N), (0xF2, Op::Jam, IMP, 0, N),

    (0x03, Op::Slo, IZX, 8, N), (0x07, Op::Slo, ZP, 5, N), (0x0F, Op::Slo, ABS, 6, N),
    (0x13, Op::Slo, IZY, 8, N), (0x17, Op::Slo, ZPX, 6, N), (0x1B, Op::Slo, ABY, 7, N),
    (0x1F, Op::Slo, ABX, 7, N),
    (0x23, Op::Rla, IZX, 8, N), (0x27, Op::Rla, ZP, 5, N), (0x2F, Op::Rla, ABS, 6, N),
    (0x33, Op::Rla, IZY, 8, N), (0x37, Op::Rla, ZPX, 6, N), (0x3B, Op::Rla, ABY, 7, N),
    (0x3F, Op::Rla, ABX, 7, N),
    (0x43, Op::Sre, IZX, 8, N), (0x47, Op::Sre, ZP, 5, N), (0x4F, Op::Sre, ABS, 6, N),
    (0x53, Op::Sre, IZY, 8, N), (0x57, Op::Sre, ZPX, 6, N), (0x5B, Op::Sre, ABY, 7, N),
    (0x5F, Op::Sre, ABX, 7, N),
    (0x63, Op::Rra, IZX, 8, N), (0x67, Op::Rra, ZP, 5, N), (0x6F, Op::Rra, ABS, 6, N),
    (0x73, Op::Rra, IZY, 8, N), (0x77, Op::Rra, ZPX, 6, N), (0x7B, Op::Rra, ABY, 7, N),
    (0x7F, Op::Rra, ABX, 7, N),
    (0xC3, Op::Dcp, IZX, 8, N), (0xC7, Op::Dcp, ZP, 5, N), (0xCF, Op::Dcp, ABS, 6, N),
    (0xD3, Op::Dcp, IZY, 8, N), (0xD7, Op::Dcp, ZPX, 6, N), (0xDB, Op::Dcp, ABY, 7, N),
    (0xDF, Op::Dcp, ABX, 7, N),
    (0xE3, Op::Isc, IZX, 8, N), (0xE7, Op::Isc, ZP, 5, N), (0xEF, Op::Isc, ABS, 6, N),
    (0xF3, Op::Isc, IZY, 8, N), (0xF7, Op::Isc, ZPX, 6, N), (0xFB, Op::Isc, ABY, 7, N),
    (0xFF, Op::Isc, ABX, 7, N),

    (0x83, Op::Sax, IZX, 6, N), (0x87, Op::Sax, ZP, 3, N), (0x8F, Op::Sax, ABS, 4, N),
    (0x97, Op::Sax, ZPY, 4, N),
    (0xA3, Op::Lax, IZX, 6, N), (0xA7, Op::Lax, ZP, 3, N), (0xAF, Op::Lax, ABS, 4, N),
    (0xB3, Op::Lax, IZY, 5, P), (0xB7, Op::Lax, ZPY, 4, N), (0xBF, Op::Lax, ABY, 4, P),

    (0x0B, Op::Anc, IMM, 2, N), (0x2B, Op::Anc, IMM, 2, N), (0x4B, Op::Alr, IMM, 2, N),
    (0x6B, Op::Arr, IMM, 2, N), (0x8B, Op::Ane, IMM, 2, N), (0xAB, Op::Lxa, IMM, 2, N),
    (0xCB, Op::Sbx, IMM, 2, N), (0xEB, Op::SbcX, IMM, 2, N),

    (0x93, Op::Sha, IZY, 6, N), (0x9F, Op::Sha, ABY, 5, N), (0x9E, Op::Shx, ABY, 5, N),
    (0x9C, Op::Shy, ABX, 5, N), (0x9B, Op::Tas, ABY, 5, N), (0xBB, Op::Las, ABY, 4, P),

    (0x1A, Op::NopX, IMP, 2, N), (0x3A, Op::NopX, IMP, 2, N), (0x5A, Op::NopX, IMP, 2, N),
    (0x7A, Op::NopX, IMP, 2, N), (0xDA, Op::NopX, IMP, 2, N), (0xFA, Op::NopX, IMP, 2, N),
    (0x80, Op::NopX, IMM, 2, N), (0x82, Op::NopX, IMM, 2, N), (0x89, Op::NopX, IMM, 2, N),
    (0xC2, Op::NopX, IMM, 2, N), (0xE2, Op::NopX, IMM, 2, N),
    (0x04, Op::NopX, ZP, 3, N), (0x44, Op::NopX, ZP, 3, N), (0x64, Op::NopX, ZP, 3, N),
    (0x0C, Op::NopX, ABS, 4, N),
    (0x14, Op::NopX, ZPX, 4, N), (0x34, Op::NopX, ZPX, 4, N), (0x54, Op::NopX, ZPX, 4, N),
    (0x74, Op::NopX, ZPX, 4, N), (0xD4, Op::NopX, ZPX, 4, N), (0xF4, Op::NopX, ZPX, 4, N),
    (0x1C, Op::NopX, ABX, 4, P), (0x3C, Op::NopX, ABX, 4, P), (0x5C, Op::NopX, ABX, 4, P),
    (0x7C, Op::NopX, ABX, 4, P), (0xDC, Op::NopX, ABX, 4, P), (0xFC, Op::NopX, ABX, 4, P),
];
