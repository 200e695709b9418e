//! Addressing modes: how the operand bytes after an opcode are interpreted.

use std::fmt;

use serde::Serialize;

/// Placeholder in an operand template replaced by the rendered operand value.
pub const OPERAND_PLACEHOLDER: &str = "@";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    /// `(zp,X)`
    IndexedIndirect,
    /// `(zp),Y`
    IndirectIndexed,
    Relative,
}

impl AddressingMode {
    pub const ALL: [AddressingMode; 13] = [
        AddressingMode::Implied,
        AddressingMode::Accumulator,
        AddressingMode::Immediate,
        AddressingMode::ZeroPage,
        AddressingMode::ZeroPageX,
        AddressingMode::ZeroPageY,
        AddressingMode::Absolute,
        AddressingMode::AbsoluteX,
        AddressingMode::AbsoluteY,
        AddressingMode::Indirect,
        AddressingMode::IndexedIndirect,
        AddressingMode::IndirectIndexed,
        AddressingMode::Relative,
    ];

    /// Short code, also used as the render class of the operand.
    pub fn code(self) -> &'static str {
        match self {
            AddressingMode::Implied => "imp",
            AddressingMode::Accumulator => "acc",
            AddressingMode::Immediate => "imm",
            AddressingMode::ZeroPage => "zp",
            AddressingMode::ZeroPageX => "zpx",
            AddressingMode::ZeroPageY => "zpy",
            AddressingMode::Absolute => "abs",
            AddressingMode::AbsoluteX => "abx",
            AddressingMode::AbsoluteY => "aby",
            AddressingMode::Indirect => "ind",
            AddressingMode::IndexedIndirect => "izx",
            AddressingMode::IndirectIndexed => "izy",
            AddressingMode::Relative => "rel",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AddressingMode::Implied => "implied",
            AddressingMode::Accumulator => "accumulator",
            AddressingMode::Immediate => "immediate",
            AddressingMode::ZeroPage => "zero page",
            AddressingMode::ZeroPageX => "zero page indexed by x",
            AddressingMode::ZeroPageY => "zero page indexed by y",
            AddressingMode::Absolute => "absolute",
            AddressingMode::AbsoluteX => "absolute indexed by x",
            AddressingMode::AbsoluteY => "absolute indexed by y",
            AddressingMode::Indirect => "indirect",
            AddressingMode::IndexedIndirect => "x-indexed zero page indirect",
            AddressingMode::IndirectIndexed => "zero page indirect y-indexed",
            AddressingMode::Relative => "relative",
        }
    }

    /// Operand template with [`OPERAND_PLACEHOLDER`] standing for the value.
    pub fn template(self) -> &'static str {
        match self {
            AddressingMode::Implied => "",
            AddressingMode::Accumulator => "a",
            AddressingMode::Immediate => "#@",
            AddressingMode::ZeroPage | AddressingMode::Absolute | AddressingMode::Relative => "@",
            AddressingMode::ZeroPageX | AddressingMode::AbsoluteX => "@,x",
            AddressingMode::ZeroPageY | AddressingMode::AbsoluteY => "@,y",
            AddressingMode::Indirect => "(@)",
            AddressingMode::IndexedIndirect => "(@,x)",
            AddressingMode::IndirectIndexed => "(@),y",
        }
    }

    /// Number of operand bytes following the opcode (0-2).
    pub fn operand_bytes(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            _ => 1,
        }
    }

    /// Operand value is known without register or memory state.
    pub fn is_static(self) -> bool {
        matches!(
            self,
            AddressingMode::Relative | AddressingMode::Absolute | AddressingMode::Immediate
        )
    }

    /// Fill the operand template with an already rendered value.
    pub fn render(self, value: &str) -> String {
        self.template().replace(OPERAND_PLACEHOLDER, value)
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
