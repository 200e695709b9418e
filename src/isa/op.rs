//! Operation catalog for the NMOS 6502, documented and undocumented.

use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Control-flow and memory semantics of an operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct OpFlags: u16 {
        /// Always transfers control to its operand (JMP).
        const JUMP      = 1 << 0;
        /// May transfer control to its operand (Bxx).
        const BRANCH    = 1 << 1;
        /// Transfers control and expects to come back (JSR).
        const CALL      = 1 << 2;
        /// Software interrupt (BRK).
        const BREAK     = 1 << 3;
        /// Locks up the processor.
        const JAM       = 1 << 4;
        /// Undocumented but executes with a stable effect.
        const ILLEGAL   = 1 << 5;
        /// Returns from a subroutine or interrupt.
        const RETURN    = 1 << 6;
        /// Writes to its memory operand.
        const WRITE     = 1 << 7;
        /// Reads from its memory operand.
        const READ      = 1 << 8;
    }
}

/// Broad grouping of an operation, used by listings and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Load,
    Store,
    Transfer,
    Stack,
    Arithmetic,
    Logic,
    Shift,
    IncDec,
    Compare,
    Branch,
    Jump,
    Subroutine,
    Flag,
    System,
    Illegal,
}

/// A 6502 operation, independent of addressing mode.
///
/// `NopX` and `SbcX` are the undocumented encodings of NOP and SBC; they render
/// with the same mnemonic as their documented twins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // undocumented
    Alr, Anc, Ane, Arr, Dcp, Isc, Jam, Las, Lax, Lxa, NopX, Rla, Rra, Sax,
    SbcX, Sbx, Sha, Shx, Shy, Slo, Sre, Tas,
}

struct OpInfo {
    mnemonic: &'static str,
    description: &'static str,
    category: Category,
    flags: OpFlags,
}

const fn info(
    mnemonic: &'static str,
    description: &'static str,
    category: Category,
    flags: OpFlags,
) -> OpInfo {
    OpInfo { mnemonic, description, category, flags }
}

const NONE: OpFlags = OpFlags::empty();
const R: OpFlags = OpFlags::READ;
const W: OpFlags = OpFlags::WRITE;
const RW: OpFlags = OpFlags::READ.union(OpFlags::WRITE);
const BR: OpFlags = OpFlags::BRANCH;
const IL: OpFlags = OpFlags::ILLEGAL;

impl Op {
    fn info(self) -> OpInfo {
        use Category::*;
        match self {
            Op::Adc => info("ADC", "add with carry", Arithmetic, R),
            Op::And => info("AND", "bitwise and with accumulator", Logic, R),
            Op::Asl => info("ASL", "arithmetic shift left", Shift, RW),
            Op::Bcc => info("BCC", "branch on carry clear", Branch, BR),
            Op::Bcs => info("BCS", "branch on carry set", Branch, BR),
            Op::Beq => info("BEQ", "branch on equal", Branch, BR),
            Op::Bit => info("BIT", "test bits", Logic, R),
            Op::Bmi => info("BMI", "branch on minus", Branch, BR),
            Op::Bne => info("BNE", "branch on not equal", Branch, BR),
            Op::Bpl => info("BPL", "branch on plus", Branch, BR),
            Op::Brk => info("BRK", "break", System, OpFlags::BREAK),
            Op::Bvc => info("BVC", "branch on overflow clear", Branch, BR),
            Op::Bvs => info("BVS", "branch on overflow set", Branch, BR),
            Op::Clc => info("CLC", "clear carry", Flag, NONE),
            Op::Cld => info("CLD", "clear decimal", Flag, NONE),
            Op::Cli => info("CLI", "clear interrupt disable", Flag, NONE),
            Op::Clv => info("CLV", "clear overflow", Flag, NONE),
            Op::Cmp => info("CMP", "compare with accumulator", Compare, R),
            Op::Cpx => info("CPX", "compare with x", Compare, R),
            Op::Cpy => info("CPY", "compare with y", Compare, R),
            Op::Dec => info("DEC", "decrement memory", IncDec, RW),
            Op::Dex => info("DEX", "decrement x", IncDec, NONE),
            Op::Dey => info("DEY", "decrement y", IncDec, NONE),
            Op::Eor => info("EOR", "exclusive or with accumulator", Logic, R),
            Op::Inc => info("INC", "increment memory", IncDec, RW),
            Op::Inx => info("INX", "increment x", IncDec, NONE),
            Op::Iny => info("INY", "increment y", IncDec, NONE),
            Op::Jmp => info("JMP", "jump", Jump, OpFlags::JUMP),
            Op::Jsr => info("JSR", "jump to subroutine", Subroutine, OpFlags::CALL),
            Op::Lda => info("LDA", "load accumulator", Load, R),
            Op::Ldx => info("LDX", "load x", Load, R),
            Op::Ldy => info("LDY", "load y", Load, R),
            Op::Lsr => info("LSR", "logical shift right", Shift, RW),
            Op::Nop => info("NOP", "no operation", System, NONE),
            Op::Ora => info("ORA", "bitwise or with accumulator", Logic, R),
            Op::Pha => info("PHA", "push accumulator", Stack, NONE),
            Op::Php => info("PHP", "push processor status", Stack, NONE),
            Op::Pla => info("PLA", "pull accumulator", Stack, NONE),
            Op::Plp => info("PLP", "pull processor status", Stack, NONE),
            Op::Rol => info("ROL", "rotate left", Shift, RW),
            Op::Ror => info("ROR", "rotate right", Shift, RW),
            Op::Rti => info("RTI", "return from interrupt", Subroutine, OpFlags::RETURN),
            Op::Rts => info("RTS", "return from subroutine", Subroutine, OpFlags::RETURN),
            Op::Sbc => info("SBC", "subtract with carry", Arithmetic, R),
            Op::Sec => info("SEC", "set carry", Flag, NONE),
            Op::Sed => info("SED", "set decimal", Flag, NONE),
            Op::Sei => info("SEI", "set interrupt disable", Flag, NONE),
            Op::Sta => info("STA", "store accumulator", Store, W),
            Op::Stx => info("STX", "store x", Store, W),
            Op::Sty => info("STY", "store y", Store, W),
            Op::Tax => info("TAX", "transfer accumulator to x", Transfer, NONE),
            Op::Tay => info("TAY", "transfer accumulator to y", Transfer, NONE),
            Op::Tsx => info("TSX", "transfer stack pointer to x", Transfer, NONE),
            Op::Txa => info("TXA", "transfer x to accumulator", Transfer, NONE),
            Op::Txs => info("TXS", "transfer x to stack pointer", Transfer, NONE),
            Op::Tya => info("TYA", "transfer y to accumulator", Transfer, NONE),

            Op::Alr => info("ALR", "and then logical shift right", Illegal, IL),
            Op::Anc => info("ANC", "and then copy bit 7 to carry", Illegal, IL),
            Op::Ane => info("ANE", "unstable and of x with accumulator", Illegal, IL),
            Op::Arr => info("ARR", "and then rotate right", Illegal, IL),
            Op::Dcp => info("DCP", "decrement then compare", Illegal, IL.union(RW)),
            Op::Isc => info("ISC", "increment then subtract", Illegal, IL.union(RW)),
            Op::Jam => info("JAM", "halt the processor", Illegal, OpFlags::JAM),
            Op::Las => info("LAS", "and memory with stack pointer", Illegal, IL.union(R)),
            Op::Lax => info("LAX", "load accumulator and x", Illegal, IL.union(R)),
            Op::Lxa => info("LXA", "unstable load of accumulator and x", Illegal, IL),
            Op::NopX => info("NOP", "undocumented no operation", Illegal, IL),
            Op::Rla => info("RLA", "rotate left then and", Illegal, IL.union(RW)),
            Op::Rra => info("RRA", "rotate right then add", Illegal, IL.union(RW)),
            Op::Sax => info("SAX", "store accumulator and x", Illegal, IL.union(W)),
            Op::SbcX => info("SBC", "undocumented subtract with carry", Illegal, IL),
            Op::Sbx => info("SBX", "subtract from accumulator and x", Illegal, IL),
            Op::Sha => info("SHA", "store accumulator and x and high byte", Illegal, IL.union(W)),
            Op::Shx => info("SHX", "store x and high byte", Illegal, IL.union(W)),
            Op::Shy => info("SHY", "store y and high byte", Illegal, IL.union(W)),
            Op::Slo => info("SLO", "shift left then or", Illegal, IL.union(RW)),
            Op::Sre => info("SRE", "shift right then exclusive or", Illegal, IL.union(RW)),
            Op::Tas => info("TAS", "transfer to stack pointer and store", Illegal, IL.union(W)),
        }
    }

    /// Upper-case assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        self.info().mnemonic
    }

    pub fn description(self) -> &'static str {
        self.info().description
    }

    pub fn category(self) -> Category {
        self.info().category
    }

    pub fn flags(self) -> OpFlags {
        self.info().flags
    }

    pub fn is_jump(self) -> bool {
        self.flags().contains(OpFlags::JUMP)
    }

    pub fn is_branch(self) -> bool {
        self.flags().contains(OpFlags::BRANCH)
    }

    pub fn is_call(self) -> bool {
        self.flags().contains(OpFlags::CALL)
    }

    pub fn is_return(self) -> bool {
        self.flags().contains(OpFlags::RETURN)
    }

    /// True for operations after which straight-line execution cannot continue.
    pub fn is_terminal(self) -> bool {
        self.flags().intersects(OpFlags::BREAK | OpFlags::JAM)
    }

    pub fn is_illegal(self) -> bool {
        self.flags().intersects(OpFlags::ILLEGAL | OpFlags::JAM)
    }

    pub fn reads_memory(self) -> bool {
        self.flags().contains(OpFlags::READ)
    }

    pub fn writes_memory(self) -> bool {
        self.flags().contains(OpFlags::WRITE)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
