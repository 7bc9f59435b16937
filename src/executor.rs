/// Run driver.
/// A `Run` owns the thread table and counters of one simulation, drives the
/// selected policy until every hardware thread has halted, and hands back an
/// immutable `RunStats`.
///
/// The thread table stays inside the run until `cpi()` finalizes it. After
/// that, `snapshot()` and `run()` report `SimError::RunFinalized`; the
/// `RunStats` returned by `run()` remains valid regardless.
use tracing::info;

use crate::error::{Result, SimError};
use crate::isa::RegisterFile;
use crate::machine::Machine;
use crate::scheduler::SchedulingPolicy;
use crate::stats::{CycleCounter, RunStats};
use crate::thread::ThreadTable;

pub struct Run<M: Machine> {
    policy: SchedulingPolicy,
    machine: M,
    /// `None` once the run has been finalized
    threads: Option<ThreadTable>,
    counter: CycleCounter,
}

impl<M: Machine> Run<M> {
    pub fn new(policy: SchedulingPolicy, machine: M) -> Result<Self> {
        let n = machine.thread_count();
        if n == 0 {
            return Err(SimError::InvalidConfig("thread count must be at least 1".to_string()));
        }
        let threads = ThreadTable::new(n)?;
        Ok(Run {
            policy,
            machine,
            threads: Some(threads),
            counter: CycleCounter::new(),
        })
    }

    /// Record a per-cycle timeline in the results.
    pub fn with_timeline(mut self) -> Self {
        self.counter = CycleCounter::with_timeline();
        self
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// Execute until every thread has halted. Never returns if some thread
    /// never halts.
    pub fn run(&mut self) -> Result<RunStats> {
        let threads = self.threads.as_mut().ok_or(SimError::RunFinalized)?;
        let mut scheduler = self.policy.build();

        info!(
            policy = scheduler.name(),
            threads = threads.len(),
            load_latency = self.machine.load_latency(),
            store_latency = self.machine.store_latency(),
            switch_cycles = self.machine.switch_cycles(),
            "run started"
        );

        while !threads.all_halted() {
            scheduler.step(threads, &mut self.machine, &mut self.counter);
        }

        let stats = self.counter.finish(scheduler.name(), threads);
        info!(
            policy = scheduler.name(),
            cycles = stats.cycles,
            instructions = stats.instructions,
            cpi = stats.cpi(),
            "run complete"
        );
        Ok(stats)
    }

    /// Copy of thread `tid`'s register file. Only valid before `cpi()`.
    pub fn snapshot(&self, tid: usize) -> Result<RegisterFile> {
        let threads = self.threads.as_ref().ok_or(SimError::RunFinalized)?;
        threads
            .get(tid)
            .map(|t| t.regs)
            .ok_or(SimError::ThreadOutOfRange { tid, threads: threads.len() })
    }

    /// Cycles per instruction. Finalizes the run and releases its thread table.
    pub fn cpi(&mut self) -> Result<f64> {
        self.threads.take().ok_or(SimError::RunFinalized)?;
        Ok(self.counter.cpi())
    }

    pub fn is_finalized(&self) -> bool {
        self.threads.is_none()
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn into_machine(self) -> M {
        self.machine
    }
}

/// Run `policy` on `machine` to completion and return its results.
pub fn simulate<M: Machine>(policy: SchedulingPolicy, machine: M) -> Result<RunStats> {
    Run::new(policy, machine)?.run()
}
