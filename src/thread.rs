/// Hardware thread state and the per-run thread table.
///
/// A thread is dispatch-eligible ("ready") when it has not halted and its
/// delay counter has drained to zero. Both schedulers share the opcode
/// semantics implemented here; they differ only in which thread they pick and
/// how they charge cycles around it.
use tracing::{debug, warn};

use crate::error::{Result, SimError};
use crate::isa::{Op, Opcode, RawInstruction, RegisterFile, REGS_COUNT};
use crate::machine::Machine;

/// Mutable state of one hardware thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    /// Index of the next instruction to fetch
    pub pc: usize,
    pub regs: RegisterFile,
    /// Cycles left before the thread may dispatch again. Never negative.
    pub delay: u32,
    /// Set by HALT and never cleared.
    pub halted: bool,
    /// Instructions this thread has committed
    pub retired: u64,
}

impl ThreadState {
    pub fn new() -> Self {
        ThreadState {
            pc: 0,
            regs: [0; REGS_COUNT],
            delay: 0,
            halted: false,
            retired: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.halted && self.delay == 0
    }

    /// Apply one decoded instruction.
    fn execute<M: Machine + ?Sized>(&mut self, op: Op, machine: &mut M) {
        let regs = &mut self.regs;
        match op {
            Op::Nop => {}
            Op::Add { dst, src1, src2 } => regs[dst] = regs[src1].wrapping_add(regs[src2]),
            Op::Sub { dst, src1, src2 } => regs[dst] = regs[src1].wrapping_sub(regs[src2]),
            Op::Addi { dst, src1, imm } => regs[dst] = regs[src1].wrapping_add(imm),
            Op::Subi { dst, src1, imm } => regs[dst] = regs[src1].wrapping_sub(imm),
            Op::Load { dst, base, offset } => {
                let addr = regs[base].wrapping_add(offset.value(regs)) as u32;
                regs[dst] = machine.read(addr);
                self.delay = machine.load_latency().saturating_add(1);
            }
            Op::Store { src, base, offset } => {
                let addr = regs[base].wrapping_add(offset.value(regs)) as u32;
                machine.write(addr, regs[src]);
                self.delay = machine.store_latency().saturating_add(1);
            }
            Op::Halt => {
                // PC stays on the HALT.
                self.halted = true;
                return;
            }
        }
        self.pc += 1;
    }
}

impl Default for ThreadState {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened when a thread was dispatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Issued {
    pub tid: usize,
    /// PC the instruction was fetched from
    pub pc: usize,
    /// `None` when the fetched opcode was not recognized
    pub opcode: Option<Opcode>,
}

/// The thread states of a single run, exclusively owned by that run.
#[derive(Debug, Clone)]
pub struct ThreadTable {
    threads: Vec<ThreadState>,
}

impl ThreadTable {
    /// Allocate `n` threads in their reset state.
    pub fn new(n: usize) -> Result<Self> {
        let mut threads = Vec::new();
        threads
            .try_reserve_exact(n)
            .map_err(|_| SimError::AllocationFailed { threads: n })?;
        threads.resize(n, ThreadState::new());
        Ok(ThreadTable { threads })
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn get(&self, tid: usize) -> Option<&ThreadState> {
        self.threads.get(tid)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ThreadState> {
        self.threads.iter()
    }

    pub fn is_ready(&self, tid: usize) -> bool {
        self.threads[tid].is_ready()
    }

    pub fn all_halted(&self) -> bool {
        self.threads.iter().all(|t| t.halted)
    }

    /// One cycle passes for every stalled thread.
    pub fn decrement_all(&mut self) {
        for t in self.threads.iter_mut() {
            t.delay = t.delay.saturating_sub(1);
        }
    }

    /// First ready thread at cyclic distance `offsets` from `start`.
    pub fn first_ready(&self, start: usize, offsets: std::ops::Range<usize>) -> Option<usize> {
        let n = self.threads.len();
        offsets
            .map(|d| (start + d) % n)
            .find(|&tid| self.threads[tid].is_ready())
    }

    /// Fetch, decode and execute the instruction at thread `tid`'s PC.
    /// Charges nothing; cycle accounting belongs to the scheduler.
    pub fn issue<M: Machine + ?Sized>(&mut self, tid: usize, machine: &mut M) -> Issued {
        let pc = self.threads[tid].pc;
        let raw: RawInstruction = machine.fetch(pc, tid);
        let thread = &mut self.threads[tid];
        thread.retired += 1;

        let opcode = match Op::decode(&raw) {
            Some(op) => {
                thread.execute(op, machine);
                if thread.halted {
                    debug!(tid, pc, "thread halted");
                }
                Some(op.opcode())
            }
            None => {
                warn!(tid, pc, opcode = raw.opcode, "unrecognized opcode, skipping");
                thread.pc += 1;
                None
            }
        };
        Issued { tid, pc, opcode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::isa::Operand;
    use crate::memory::SimMachine;

    fn machine(program: Vec<RawInstruction>) -> SimMachine {
        let config = SimConfig { threads: 1, load_latency: 3, store_latency: 2, switch_cycles: 0 };
        SimMachine::new(config, vec![program]).unwrap()
    }

    #[test]
    fn new_table_is_reset() {
        let table = ThreadTable::new(4).unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|t| *t == ThreadState::new()));
        assert!(!table.all_halted());
    }

    #[test]
    fn decrement_saturates_at_zero() {
        let mut table = ThreadTable::new(2).unwrap();
        table.threads[0].delay = 1;
        table.decrement_all();
        table.decrement_all();
        assert_eq!(table.threads[0].delay, 0);
        assert_eq!(table.threads[1].delay, 0);
    }

    #[test]
    fn halted_thread_is_never_ready() {
        let mut table = ThreadTable::new(3).unwrap();
        table.threads[1].halted = true;
        assert!(!table.is_ready(1));
        assert_eq!(table.first_ready(1, 0..3), Some(2));
        table.threads[2].delay = 2;
        assert_eq!(table.first_ready(1, 0..3), Some(0));
        assert_eq!(table.first_ready(1, 1..2), None);
    }

    #[test]
    fn arithmetic_and_halt() {
        let mut m = machine(vec![
            RawInstruction::addi(1, 0, 5),
            RawInstruction::addi(2, 0, 7),
            RawInstruction::add(3, 1, 2),
            RawInstruction::sub(4, 1, 2),
            RawInstruction::subi(5, 3, 2),
            RawInstruction::halt(),
        ]);
        let mut table = ThreadTable::new(1).unwrap();
        for _ in 0..6 {
            table.issue(0, &mut m);
        }
        let t = table.get(0).unwrap();
        assert_eq!(&t.regs[1..6], &[5, 7, 12, -2, 10]);
        assert!(t.halted);
        assert_eq!(t.pc, 5);
        assert_eq!(t.retired, 6);
    }

    #[test]
    fn memory_ops_set_delay_and_move_data() {
        let mut m = machine(vec![
            RawInstruction::addi(1, 0, 100),
            RawInstruction::addi(2, 0, 42),
            RawInstruction::store(2, 1, Operand::Imm(4)),
            RawInstruction::load(3, 1, Operand::Imm(4)),
        ]);
        let mut table = ThreadTable::new(1).unwrap();
        table.issue(0, &mut m);
        table.issue(0, &mut m);
        table.issue(0, &mut m);
        assert_eq!(table.get(0).unwrap().delay, 3);
        assert_eq!(m.data().read(104), 42);

        table.threads[0].delay = 0;
        table.issue(0, &mut m);
        let t = table.get(0).unwrap();
        assert_eq!(t.regs[3], 42);
        assert_eq!(t.delay, 4);
    }

    #[test]
    fn load_with_register_offset() {
        let mut m = machine(vec![
            RawInstruction::addi(1, 0, 10),
            RawInstruction::addi(2, 0, 6),
            RawInstruction::load(1, 1, Operand::Reg(2)),
        ]);
        m.data_mut().write(16, -9);
        let mut table = ThreadTable::new(1).unwrap();
        for _ in 0..3 {
            table.issue(0, &mut m);
        }
        assert_eq!(table.get(0).unwrap().regs[1], -9);
    }

    #[test]
    fn unknown_opcode_only_advances_pc() {
        let mut m = machine(vec![RawInstruction::unknown(99)]);
        let mut table = ThreadTable::new(1).unwrap();
        let issued = table.issue(0, &mut m);
        assert_eq!(issued.opcode, None);
        let t = table.get(0).unwrap();
        assert_eq!(t.pc, 1);
        assert_eq!(t.regs, [0; REGS_COUNT]);
        assert!(!t.halted);
    }

    #[test]
    fn oversized_table_reports_allocation_failure() {
        let n = usize::MAX / 2;
        assert!(matches!(
            ThreadTable::new(n),
            Err(SimError::AllocationFailed { threads }) if threads == n
        ));
    }
}
