//! Decoded listing lines: real instructions and assembler directives.

use serde::Serialize;

use crate::format::Dialect;
use crate::isa::{AddressingMode, Instruction, Op};
use crate::strategy::Disassembler;
use crate::symbols::Symbol;

/// An instruction together with the operand bytes read at one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullInstruction {
    pub instruction: Instruction,
    bytes: [u8; 3],
}

impl FullInstruction {
    /// `bytes` starts at the opcode and holds at least `instruction.length` bytes.
    pub fn new(instruction: Instruction, bytes: &[u8]) -> Self {
        let mut buf = [0u8; 3];
        let len = (instruction.length as usize).min(bytes.len()).min(3);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { instruction, bytes: buf }
    }

    pub fn op(&self) -> Op {
        self.instruction.op
    }

    pub fn mode(&self) -> AddressingMode {
        self.instruction.mode
    }

    pub fn len(&self) -> usize {
        self.instruction.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Operand as a little-endian word; single-byte operands are zero-extended.
    pub fn operand(&self) -> u16 {
        match self.instruction.mode.operand_bytes() {
            0 => 0,
            1 => self.bytes[1] as u16,
            _ => u16::from_le_bytes([self.bytes[1], self.bytes[2]]),
        }
    }

    /// Operand value is known without register or memory state.
    pub fn is_static(&self) -> bool {
        self.instruction.mode.is_static()
    }

    /// Control transfer target when the instruction sits at `address`.
    pub fn target(&self, address: u16) -> Option<u16> {
        match self.instruction.mode {
            AddressingMode::Relative => {
                let offset = self.bytes[1] as i8 as u16;
                Some(address.wrapping_add(2).wrapping_add(offset))
            }
            AddressingMode::Absolute => Some(self.operand()),
            _ => None,
        }
    }

    /// Address the operand refers to, indexed or not; `None` for immediates.
    pub fn operand_address(&self, address: u16) -> Option<u16> {
        match self.instruction.mode {
            AddressingMode::Implied | AddressingMode::Accumulator | AddressingMode::Immediate => None,
            AddressingMode::Relative => self.target(address),
            _ => Some(self.operand()),
        }
    }

    /// Directly addressed memory location, if statically known.
    pub fn memory_operand(&self) -> Option<u16> {
        (self.instruction.mode == AddressingMode::Absolute).then(|| self.operand())
    }
}

/// Labels and comments attached to a line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    pub labels: Vec<String>,
    pub comments: Vec<String>,
}

impl Annotations {
    pub fn label(label: impl Into<String>) -> Self {
        Self { labels: vec![label.into()], comments: Vec::new() }
    }

    pub fn comment(comment: impl Into<String>) -> Self {
        Self { labels: Vec::new(), comments: vec![comment.into()] }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.comments.is_empty()
    }

    /// Append `other`'s labels and comments, skipping duplicates.
    pub fn merge(&mut self, other: &Annotations) {
        for label in &other.labels {
            if !self.labels.contains(label) {
                self.labels.push(label.clone());
            }
        }
        for comment in &other.comments {
            if !self.comments.contains(comment) {
                self.comments.push(comment.clone());
            }
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }
}

/// What a data declaration holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Bytes,
    /// Little-endian 16-bit words or vectors.
    Words,
    Text,
    /// Cartridge auto-start signature.
    Signature,
}

/// One line of disassembly output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionLike {
    Instruction {
        address: u16,
        instruction: FullInstruction,
        notes: Annotations,
    },
    Data {
        address: u16,
        kind: DataKind,
        bytes: Vec<u8>,
        notes: Annotations,
    },
    /// `* = $xxxx`
    PcAssignment { address: u16 },
    /// `NAME = $xxxx`
    SymbolDefinition(Symbol),
    /// Blank or label/comment-only line.
    Blank { notes: Annotations },
}

impl InstructionLike {
    pub fn bytes(&self) -> &[u8] {
        match self {
            InstructionLike::Instruction { instruction, .. } => instruction.bytes(),
            InstructionLike::Data { bytes, .. } => bytes,
            _ => &[],
        }
    }

    /// Number of binary bytes this line accounts for.
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn address(&self) -> Option<u16> {
        match self {
            InstructionLike::Instruction { address, .. }
            | InstructionLike::Data { address, .. }
            | InstructionLike::PcAssignment { address } => Some(*address),
            InstructionLike::SymbolDefinition(symbol) => Some(symbol.address),
            InstructionLike::Blank { .. } => None,
        }
    }

    pub fn notes(&self) -> Option<&Annotations> {
        match self {
            InstructionLike::Instruction { notes, .. }
            | InstructionLike::Data { notes, .. }
            | InstructionLike::Blank { notes } => Some(notes),
            _ => None,
        }
    }

    pub fn as_instruction(&self) -> Option<&FullInstruction> {
        match self {
            InstructionLike::Instruction { instruction, .. } => Some(instruction),
            _ => None,
        }
    }

    /// Render through `dialect`, with the disassembler as read-only context.
    pub fn disassemble(&self, dialect: &dyn Dialect, dis: &Disassembler<'_>) -> String {
        match self {
            InstructionLike::Instruction { address, instruction, notes } => {
                dialect.instruction(*address, instruction, notes, dis)
            }
            InstructionLike::Data { address, kind, bytes, notes } => {
                dialect.data(*address, *kind, bytes, notes, dis)
            }
            InstructionLike::PcAssignment { address } => dialect.pc_assignment(*address),
            InstructionLike::SymbolDefinition(symbol) => dialect.symbol_definition(symbol),
            InstructionLike::Blank { notes } => dialect.blank(notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::InstructionSet;

    fn decode(bytes: &[u8]) -> FullInstruction {
        let set = InstructionSet::documented();
        FullInstruction::new(*set.instruction(bytes[0]).unwrap(), bytes)
    }

    #[test]
    fn test_absolute_operand() {
        let jmp = decode(&[0x4C, 0x34, 0x12]);
        assert_eq!(jmp.operand(), 0x1234);
        assert_eq!(jmp.target(0x0801), Some(0x1234));
        assert!(jmp.is_static());
        assert_eq!(jmp.bytes(), &[0x4C, 0x34, 0x12]);
    }

    #[test]
    fn test_relative_target_wraps() {
        let back = decode(&[0xD0, 0xFE]);
        assert_eq!(back.target(0x1000), Some(0x1000));
        let forward = decode(&[0xB0, 0x03]);
        assert_eq!(forward.target(0xFFFE), Some(0x0003));
    }

    #[test]
    fn test_indexed_is_not_static() {
        let lda = decode(&[0xBD, 0x00, 0x04]);
        assert!(!lda.is_static());
        assert_eq!(lda.target(0), None);
        assert_eq!(lda.memory_operand(), None);
        assert_eq!(lda.operand_address(0), Some(0x0400));
        let jmp_ind = decode(&[0x6C, 0xFC, 0xFF]);
        assert_eq!(jmp_ind.target(0), None);
    }

    #[test]
    fn test_line_lengths() {
        let data = InstructionLike::Data {
            address: 0x1000,
            kind: DataKind::Bytes,
            bytes: vec![1, 2, 3],
            notes: Annotations::default(),
        };
        assert_eq!(data.len(), 3);
        assert_eq!(InstructionLike::PcAssignment { address: 0x0801 }.len(), 0);
    }

    #[test]
    fn test_merge_skips_duplicates() {
        let mut notes = Annotations::label("start");
        notes.merge(&Annotations::label("start").with_comment("entry"));
        assert_eq!(notes.labels, vec!["start"]);
        assert_eq!(notes.comments, vec!["entry"]);
    }
}
