//! Static control-flow tracing over a full address space.
//!
//! No register or memory values are modelled. Each [`Thread`] is one
//! hypothetical execution path. A conditional branch forks a new thread at
//! its target, JMP and JSR redirect the thread, and everything else
//! (returns included) falls through to the next instruction. Any thread
//! reaching an address some thread already executed halts. Together with
//! the step bound passed to [`Tracer::trace`] this guarantees termination.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::isa::AddressingMode;
use crate::memory::{ByteSource, Memory};
use crate::{Decoder, DisassemblyError, FullInstruction};

/// Why a thread stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// Address already executed by some thread
    Cycle,
    Break,
    /// Processor lock-up, or an opcode the instruction set does not define
    Jam,
    /// Instruction or jump vector lies past the end of memory
    OutOfBounds,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            HaltReason::Cycle => "already executed",
            HaltReason::Break => "break",
            HaltReason::Jam => "jam",
            HaltReason::OutOfBounds => "outside memory",
        };
        f.write_str(reason)
    }
}

/// One hypothetical execution path.
#[derive(Debug, Clone)]
pub struct Thread {
    id: usize,
    /// Thread that forked this one, `None` for entry points.
    parent: Option<usize>,
    pc: u16,
    executed: BTreeSet<u16>,
    read: BTreeSet<u16>,
    written: BTreeSet<u16>,
    halted: Option<HaltReason>,
}

impl Thread {
    fn new(id: usize, parent: Option<usize>, pc: u16) -> Self {
        Self {
            id,
            parent,
            pc,
            executed: BTreeSet::new(),
            read: BTreeSet::new(),
            written: BTreeSet::new(),
            halted: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn is_running(&self) -> bool {
        self.halted.is_none()
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halted
    }

    pub fn executed(&self) -> &BTreeSet<u16> {
        &self.executed
    }

    pub fn read(&self) -> &BTreeSet<u16> {
        &self.read
    }

    pub fn written(&self) -> &BTreeSet<u16> {
        &self.written
    }

    fn halt(&mut self, reason: HaltReason) {
        log::trace!("thread {} halted at ${:04x}: {}", self.id, self.pc, reason);
        self.halted = Some(reason);
    }
}

fn is_rom(address: u16) -> bool {
    address >= 0xA000
}

/// Tracer configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracerOptions {
    /// Subroutines whose calls are stepped over, typically ROM routines.
    pub ignore: Option<fn(u16) -> bool>,
}

impl TracerOptions {
    /// Skip everything at or above `$A000` (BASIC and Kernal ROM on both machines).
    pub fn skip_rom() -> Self {
        Self { ignore: Some(is_rom) }
    }

    fn ignores(&self, address: u16) -> bool {
        self.ignore.is_some_and(|ignore| ignore(address))
    }
}

/// Drives [`Thread`]s through `memory` one instruction at a time.
pub struct Tracer<'a> {
    decoder: &'a dyn Decoder,
    memory: &'a Memory,
    options: TracerOptions,
    threads: Vec<Thread>,
    visited: Vec<bool>,
    instructions: BTreeMap<u16, FullInstruction>,
    steps: usize,
}

impl<'a> Tracer<'a> {
    /// One running thread per entry point.
    pub fn new(decoder: &'a dyn Decoder, memory: &'a Memory, entry_points: &[u16]) -> Result<Self, DisassemblyError> {
        Self::with_options(decoder, memory, entry_points, TracerOptions::default())
    }

    pub fn with_options(
        decoder: &'a dyn Decoder,
        memory: &'a Memory,
        entry_points: &[u16],
        options: TracerOptions,
    ) -> Result<Self, DisassemblyError> {
        if !memory.is_executable() {
            return Err(DisassemblyError::NotExecutable(memory.name().to_string()));
        }
        if let Some(&pc) = entry_points.iter().find(|&&pc| pc as usize >= memory.len()) {
            return Err(DisassemblyError::PcOutOfBounds(pc as usize));
        }
        let threads = entry_points
            .iter()
            .enumerate()
            .map(|(id, &pc)| Thread::new(id, None, pc))
            .collect();
        Ok(Self {
            decoder,
            memory,
            options,
            threads,
            visited: vec![false; memory.len()],
            instructions: BTreeMap::new(),
            steps: 0,
        })
    }

    /// True while any thread is still running.
    pub fn running(&self) -> bool {
        self.threads.iter().any(Thread::is_running)
    }

    pub fn count_active_threads(&self) -> usize {
        self.threads.iter().filter(|t| t.is_running()).count()
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Total steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn executed_addresses(&self) -> BTreeSet<u16> {
        self.threads.iter().flat_map(|t| t.executed.iter().copied()).collect()
    }

    pub fn get_written(&self) -> BTreeSet<u16> {
        self.threads.iter().flat_map(|t| t.written.iter().copied()).collect()
    }

    pub fn get_read(&self) -> BTreeSet<u16> {
        self.threads.iter().flat_map(|t| t.read.iter().copied()).collect()
    }

    /// Every instruction decoded while tracing, by address.
    pub fn executed_instructions(&self) -> &BTreeMap<u16, FullInstruction> {
        &self.instructions
    }

    /// Advance the lowest-numbered running thread by one instruction.
    ///
    /// Returns `false` if nothing was running.
    pub fn step(&mut self) -> bool {
        match self.threads.iter().position(Thread::is_running) {
            Some(index) => {
                self.step_thread(index);
                true
            }
            None => false,
        }
    }

    /// Advance every thread running now once; threads forked meanwhile wait
    /// for the next call. Returns how many threads were stepped.
    pub fn step_all(&mut self) -> usize {
        let running: Vec<usize> = (0..self.threads.len())
            .filter(|&i| self.threads[i].is_running())
            .collect();
        for &index in &running {
            self.step_thread(index);
        }
        running.len()
    }

    /// Step until nothing runs or `max_steps` steps were taken in this call.
    ///
    /// Returns the steps actually taken. If [`Tracer::running`] is still
    /// true afterwards the result is incomplete.
    pub fn trace(&mut self, max_steps: usize) -> usize {
        log::debug!(
            "Tracing {} with {} threads, at most {} steps",
            self.memory.name(),
            self.count_active_threads(),
            max_steps
        );
        let mut taken = 0;
        while taken < max_steps && self.step() {
            taken += 1;
        }
        log::debug!(
            "Trace stopped after {} steps: {} threads, {} executed, {} still running",
            taken,
            self.threads.len(),
            self.instructions.len(),
            self.count_active_threads()
        );
        taken
    }

    fn fork(&mut self, parent: usize, pc: u16) {
        if pc as usize >= self.memory.len() {
            log::trace!("thread {} not forked to ${:04x}: outside memory", parent, pc);
            return;
        }
        let id = self.threads.len();
        log::trace!("thread {} forks thread {} at ${:04x}", parent, id, pc);
        self.threads.push(Thread::new(id, Some(parent), pc));
    }

    /// Where a JMP or JSR at `pc` goes. Indirect jumps read their vector
    /// from the loaded image, wrapping within the vector's page like the NMOS
    /// part does.
    fn jump_target(&self, pc: u16, instruction: &FullInstruction) -> Result<Option<u16>, DisassemblyError> {
        if instruction.mode() != AddressingMode::Indirect {
            return Ok(instruction.target(pc));
        }
        let vector = instruction.operand();
        let high = (vector & 0xFF00) | (vector.wrapping_add(1) & 0x00FF);
        let lo = self.memory.read8(vector as usize)?;
        let hi = self.memory.read8(high as usize)?;
        Ok(Some(u16::from_le_bytes([lo, hi])))
    }

    fn step_thread(&mut self, index: usize) {
        self.steps += 1;
        let pc = self.threads[index].pc;
        let at = pc as usize;
        if at >= self.memory.len() {
            self.threads[index].halt(HaltReason::OutOfBounds);
            return;
        }
        if self.visited[at] {
            self.threads[index].halt(HaltReason::Cycle);
            return;
        }

        let decoded = self.decoder.decode(self.memory, at);
        self.visited[at] = true;
        self.threads[index].executed.insert(pc);

        let instruction = match decoded {
            Ok(Some(instruction)) => instruction,
            Ok(None) => return self.threads[index].halt(HaltReason::Jam),
            Err(_) => return self.threads[index].halt(HaltReason::OutOfBounds),
        };
        self.instructions.insert(pc, instruction);

        let op = instruction.op();
        let next = pc.wrapping_add(instruction.len() as u16);

        if op.is_terminal() {
            let reason = if op.is_illegal() { HaltReason::Jam } else { HaltReason::Break };
            self.threads[index].halt(reason);
        } else if op.is_jump() || op.is_call() {
            let target = match self.jump_target(pc, &instruction) {
                Ok(Some(target)) => target,
                _ => return self.threads[index].halt(HaltReason::OutOfBounds),
            };
            let thread = &mut self.threads[index];
            if op.is_call() && self.options.ignores(target) {
                log::trace!("thread {} steps over call to ${:04x}", thread.id, target);
                thread.pc = next;
            } else {
                thread.pc = target;
            }
        } else if op.is_branch() {
            self.threads[index].pc = next;
            if let Some(target) = instruction.target(pc) {
                self.fork(index, target);
            }
        } else {
            let thread = &mut self.threads[index];
            if let Some(address) = instruction.memory_operand() {
                if op.reads_memory() {
                    thread.read.insert(address);
                }
                if op.writes_memory() {
                    thread.written.insert(address);
                }
            }
            thread.pc = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Mos6502Decoder;
    use crate::memory::Endian;
    use pretty_assertions::assert_eq;

    fn space(code: &[u8], at: usize) -> Memory {
        let mut memory = Memory::address_space("test");
        memory.load(code, at).unwrap();
        memory
    }

    #[test]
    fn test_rejects_non_executable_memory() {
        let memory = Memory::from_bytes("data", vec![0xEA], Endian::Little);
        let decoder = Mos6502Decoder::documented();
        assert!(matches!(
            Tracer::new(&decoder, &memory, &[0]),
            Err(DisassemblyError::NotExecutable(_))
        ));
    }

    #[test]
    fn test_rejects_entry_outside_memory() {
        let mut memory = Memory::from_bytes("small", vec![0xEA; 16], Endian::Little);
        memory.set_executable(true);
        let decoder = Mos6502Decoder::documented();
        assert!(matches!(
            Tracer::new(&decoder, &memory, &[0x20]),
            Err(DisassemblyError::PcOutOfBounds(0x20))
        ));
    }

    #[test]
    fn test_loop_halts_on_revisit() {
        // loop: INX / JMP loop
        let memory = space(&[0xE8, 0x4C, 0x00, 0x10], 0x1000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x1000]).unwrap();
        assert_eq!(tracer.trace(100), 3);
        assert!(!tracer.running());
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::Cycle));
        assert_eq!(tracer.executed_addresses(), BTreeSet::from([0x1000, 0x1001]));
    }

    #[test]
    fn test_branch_forks_one_thread() {
        // BNE +2 / NOP / NOP / RTS
        let memory = space(&[0xD0, 0x02, 0xEA, 0xEA, 0x60], 0x2000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x2000]).unwrap();
        assert_eq!(tracer.step_all(), 1);
        assert_eq!(tracer.count_active_threads(), 2);
        let pcs: Vec<u16> = tracer.threads().iter().map(Thread::pc).collect();
        assert_eq!(pcs, vec![0x2002, 0x2004]);
        assert_eq!(tracer.threads()[1].parent(), Some(0));
    }

    #[test]
    fn test_step_all_defers_new_threads() {
        // BEQ +0 forks onto its own fall-through
        let memory = space(&[0xF0, 0x00, 0x00], 0x3000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x3000]).unwrap();
        tracer.step_all();
        assert_eq!(tracer.threads().len(), 2);
        assert_eq!(tracer.step_all(), 2);
        // first thread executes the BRK, the forked one finds it executed
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::Break));
        assert_eq!(tracer.threads()[1].halt_reason(), Some(HaltReason::Cycle));
    }

    #[test]
    fn test_calls_redirect_like_jumps() {
        // JSR $4010 / BRK ... $4010: RTS, then unloaded memory
        let mut code = vec![0x20, 0x10, 0x40, 0x00];
        code.resize(0x10, 0xEA);
        code.push(0x60);
        let memory = space(&code, 0x4000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x4000]).unwrap();
        tracer.trace(10);
        assert!(!tracer.running());
        assert_eq!(tracer.threads().len(), 1);
        assert_eq!(tracer.executed_addresses(), BTreeSet::from([0x4000, 0x4010, 0x4011]));
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::Break));
    }

    #[test]
    fn test_return_falls_through() {
        // RTS / NOP / BRK
        let memory = space(&[0x60, 0xEA, 0x00], 0x1000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x1000]).unwrap();
        assert_eq!(tracer.trace(10), 3);
        assert_eq!(tracer.executed_addresses(), BTreeSet::from([0x1000, 0x1001, 0x1002]));
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::Break));
    }

    #[test]
    fn test_ignored_calls_are_stepped_over() {
        // JSR CHROUT / RTS, then unloaded memory
        let memory = space(&[0x20, 0xD2, 0xFF, 0x60], 0xC000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer =
            Tracer::with_options(&decoder, &memory, &[0xC000], TracerOptions::skip_rom()).unwrap();
        tracer.trace(10);
        assert_eq!(tracer.threads().len(), 1);
        assert_eq!(tracer.executed_addresses(), BTreeSet::from([0xC000, 0xC003, 0xC004]));
        assert!(!tracer.executed_addresses().contains(&0xFFD2));
    }

    #[test]
    fn test_ignore_predicate_does_not_apply_to_jumps() {
        // JMP $E000 lands on unloaded memory, which is BRK
        let memory = space(&[0x4C, 0x00, 0xE0], 0xC000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer =
            Tracer::with_options(&decoder, &memory, &[0xC000], TracerOptions::skip_rom()).unwrap();
        tracer.trace(10);
        assert_eq!(tracer.executed_addresses(), BTreeSet::from([0xC000, 0xE000]));
    }

    #[test]
    fn test_indirect_jump_reads_vector() {
        // JMP ($0900) with $0900 = $0810; $0810: NOP / BRK
        let mut memory = space(&[0x6C, 0x00, 0x09], 0x0800);
        memory.load(&[0x10, 0x08], 0x0900).unwrap();
        memory.load(&[0xEA, 0x00], 0x0810).unwrap();
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x0800]).unwrap();
        tracer.trace(10);
        assert_eq!(tracer.executed_addresses(), BTreeSet::from([0x0800, 0x0810, 0x0811]));
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::Break));
    }

    #[test]
    fn test_indirect_jump_vector_wraps_within_page() {
        // JMP ($08FF) takes its high byte from $0800, not $0900
        let mut memory = space(&[0x6C, 0xFF, 0x08], 0x0800);
        memory.load(&[0x20], 0x08FF).unwrap();
        memory.load(&[0x09], 0x0900).unwrap();
        memory.load(&[0x00], 0x6C20).unwrap();
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x0800]).unwrap();
        tracer.trace(10);
        assert_eq!(tracer.executed_addresses(), BTreeSet::from([0x0800, 0x6C20]));
    }

    #[test]
    fn test_undefined_opcode_jams() {
        let memory = space(&[0xEA, 0x02], 0x1000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x1000]).unwrap();
        tracer.trace(10);
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::Jam));
    }

    #[test]
    fn test_instruction_past_end_of_memory() {
        // NOP / LDA abs with only one operand byte left
        let mut memory = Memory::from_bytes("short", vec![0xEA, 0xAD, 0x00], Endian::Little);
        memory.set_executable(true);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0]).unwrap();
        tracer.trace(10);
        assert!(!tracer.running());
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::OutOfBounds));
    }

    #[test]
    fn test_reads_and_writes_recorded() {
        // LDA $D012 / STA $D020 / INC $0400 / LDA $0400,X / BRK
        let memory = space(
            &[0xAD, 0x12, 0xD0, 0x8D, 0x20, 0xD0, 0xEE, 0x00, 0x04, 0xBD, 0x00, 0x04, 0x00],
            0xC000,
        );
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0xC000]).unwrap();
        tracer.trace(100);
        assert_eq!(tracer.get_read(), BTreeSet::from([0xD012, 0x0400]));
        assert_eq!(tracer.get_written(), BTreeSet::from([0xD020, 0x0400]));
        assert_eq!(tracer.executed_instructions().len(), 5);
    }

    #[test]
    fn test_jam_halts_with_full_set() {
        let memory = space(&[0xEA, 0x02], 0x1000);
        let decoder = Mos6502Decoder::undocumented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x1000]).unwrap();
        tracer.trace(10);
        assert_eq!(tracer.threads()[0].halt_reason(), Some(HaltReason::Jam));
    }

    #[test]
    fn test_step_bound_is_respected() {
        // a long NOP slide never revisits anything within the bound
        let memory = space(&[0xEA; 0x200], 0x1000);
        let decoder = Mos6502Decoder::documented();
        let mut tracer = Tracer::new(&decoder, &memory, &[0x1000]).unwrap();
        assert_eq!(tracer.trace(50), 50);
        assert!(tracer.running());
        assert_eq!(tracer.steps(), 50);
    }
}
