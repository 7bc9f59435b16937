/// Thread dispatch policies for a multithreaded in-order core.
///
/// At most one instruction issues per cycle. The policy decides which hardware
/// thread supplies it and what switching between threads costs:
///   - Blocked     (coarse-grained): run one thread until it stalls or halts,
///                                    then pay a fixed penalty to switch
///   - FineGrained (interleaved):    rotate threads every cycle, no penalty
///
/// Each cycle in which nothing issues is charged as idle or as switch penalty,
/// never as an instruction.
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::machine::Machine;
use crate::stats::CycleCounter;
use crate::thread::ThreadTable;

/// A dispatch policy driving one run.
pub trait ThreadScheduler: Send {
    /// Advance the run by one scheduling decision. The caller stops stepping
    /// once every thread has halted.
    fn step(&mut self, threads: &mut ThreadTable, machine: &mut dyn Machine, counter: &mut CycleCounter);

    /// Thread the scheduler currently points at.
    fn current(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Dispatch the current thread, charge its cycle, then let time pass.
/// The dispatch cycle absorbs one unit of any delay the instruction just set.
fn dispatch(tid: usize, threads: &mut ThreadTable, machine: &mut dyn Machine, counter: &mut CycleCounter) {
    let issued = threads.issue(tid, machine);
    trace!(tid, pc = issued.pc, opcode = ?issued.opcode, cycle = counter.cycles, "issue");
    counter.issued(&issued);
    threads.decrement_all();
}

fn idle(threads: &mut ThreadTable, counter: &mut CycleCounter) {
    trace!(cycle = counter.cycles, "idle");
    counter.idle();
    threads.decrement_all();
}

// ---------------------------------------------------------------------------
// Blocked (coarse-grained) multithreading
// ---------------------------------------------------------------------------

/// Sticks with one thread until it halts or stalls on memory. A replacement is
/// the nearest ready thread in cyclic order after the current one; switching to
/// it costs `switch_cycles` cycles during which nothing issues.
///
/// When no replacement exists, the idle cycle is charged on the following step
/// rather than the one that discovered the stall.
pub struct BlockedScheduler {
    current: usize,
    idle_pending: bool,
}

impl BlockedScheduler {
    pub fn new() -> Self {
        BlockedScheduler {
            current: 0,
            idle_pending: false,
        }
    }

    fn switch_to(
        &mut self,
        next: usize,
        penalty: u32,
        threads: &mut ThreadTable,
        counter: &mut CycleCounter,
    ) {
        let from = self.current;
        debug!(from, to = next, penalty, cycle = counter.cycles, "context switch");
        self.current = next;
        counter.switch_started();
        for _ in 0..penalty {
            counter.switch_cycle(from, next);
            threads.decrement_all();
        }
    }
}

impl Default for BlockedScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadScheduler for BlockedScheduler {
    fn step(&mut self, threads: &mut ThreadTable, machine: &mut dyn Machine, counter: &mut CycleCounter) {
        if self.idle_pending {
            self.idle_pending = false;
            idle(threads, counter);
            return;
        }

        if !threads.is_ready(self.current) {
            // Current thread itself is excluded from the search.
            match threads.first_ready(self.current, 1..threads.len()) {
                Some(next) => {
                    let penalty = machine.switch_cycles();
                    self.switch_to(next, penalty, threads, counter);
                }
                None => self.idle_pending = true,
            }
            return;
        }

        dispatch(self.current, threads, machine, counter);
    }

    fn current(&self) -> usize {
        self.current
    }

    fn name(&self) -> &'static str {
        "Blocked"
    }
}

// ---------------------------------------------------------------------------
// Fine-grained (interleaved) multithreading
// ---------------------------------------------------------------------------

/// Round-robin over ready threads, one instruction per cycle, free switches.
/// The search starts at the current thread; after a dispatch the pointer moves
/// one past the thread that issued.
pub struct FineGrainedScheduler {
    current: usize,
}

impl FineGrainedScheduler {
    pub fn new() -> Self {
        FineGrainedScheduler { current: 0 }
    }
}

impl Default for FineGrainedScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadScheduler for FineGrainedScheduler {
    fn step(&mut self, threads: &mut ThreadTable, machine: &mut dyn Machine, counter: &mut CycleCounter) {
        let n = threads.len();
        match threads.first_ready(self.current, 0..n) {
            Some(tid) => {
                dispatch(tid, threads, machine, counter);
                self.current = (tid + 1) % n;
            }
            None => idle(threads, counter),
        }
    }

    fn current(&self) -> usize {
        self.current
    }

    fn name(&self) -> &'static str {
        "FineGrained"
    }
}

// ---------------------------------------------------------------------------
// Policy selector
// ---------------------------------------------------------------------------

/// Selectable multithreading policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    /// Coarse-grained, switch on stall
    Blocked,
    /// Interleaved, switch every cycle
    FineGrained,
}

impl SchedulingPolicy {
    pub const ALL: [SchedulingPolicy; 2] = [SchedulingPolicy::Blocked, SchedulingPolicy::FineGrained];

    pub fn build(self) -> Box<dyn ThreadScheduler> {
        match self {
            SchedulingPolicy::Blocked => Box::new(BlockedScheduler::new()),
            SchedulingPolicy::FineGrained => Box::new(FineGrainedScheduler::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchedulingPolicy::Blocked => "Blocked",
            SchedulingPolicy::FineGrained => "FineGrained",
        }
    }
}

impl std::fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
