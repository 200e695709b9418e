//! The 6502 instruction set: operations, addressing modes and the opcode table.

mod mode;
mod op;
mod table;

pub use self::mode::{AddressingMode, OPERAND_PLACEHOLDER};
pub use self::op::{Category, Op, OpFlags};
pub use self::table::{Cycles, Instruction, InstructionSet, Penalty};
