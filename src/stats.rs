/// Run accounting and the immutable results of a finished run.
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::isa::RegisterFile;
use crate::thread::{Issued, ThreadTable};

/// What the core did in one simulated cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleEvent {
    /// Thread `tid` committed the instruction at `pc`
    Issue { tid: usize, pc: usize },
    /// No thread was ready
    Idle,
    /// One cycle of a context switch penalty
    Switch { from: usize, to: usize },
}

/// Cycles per instruction; 0.0 when nothing was committed.
pub fn cpi(cycles: u64, instructions: u64) -> f64 {
    if instructions == 0 {
        0.0
    } else {
        cycles as f64 / instructions as f64
    }
}

/// Counters a scheduler charges while driving a run.
#[derive(Debug, Default)]
pub struct CycleCounter {
    pub cycles: u64,
    pub instructions: u64,
    pub idle_cycles: u64,
    pub switch_cycles: u64,
    pub switches: u64,
    timeline: Option<Vec<CycleEvent>>,
}

impl CycleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep one `CycleEvent` per charged cycle.
    pub fn with_timeline() -> Self {
        CycleCounter {
            timeline: Some(Vec::new()),
            ..Self::default()
        }
    }

    fn record(&mut self, event: CycleEvent) {
        if let Some(timeline) = self.timeline.as_mut() {
            timeline.push(event);
        }
    }

    pub fn issued(&mut self, issued: &Issued) {
        self.cycles += 1;
        self.instructions += 1;
        self.record(CycleEvent::Issue { tid: issued.tid, pc: issued.pc });
    }

    pub fn idle(&mut self) {
        self.cycles += 1;
        self.idle_cycles += 1;
        self.record(CycleEvent::Idle);
    }

    /// A context switch begins; its penalty cycles follow via `switch_cycle`.
    pub fn switch_started(&mut self) {
        self.switches += 1;
    }

    pub fn switch_cycle(&mut self, from: usize, to: usize) {
        self.cycles += 1;
        self.switch_cycles += 1;
        self.record(CycleEvent::Switch { from, to });
    }

    pub fn cpi(&self) -> f64 {
        cpi(self.cycles, self.instructions)
    }

    /// Capture the final results.
    pub fn finish(&self, policy: &str, threads: &ThreadTable) -> RunStats {
        RunStats {
            policy: policy.to_string(),
            cycles: self.cycles,
            instructions: self.instructions,
            idle_cycles: self.idle_cycles,
            switch_cycles: self.switch_cycles,
            switches: self.switches,
            threads: threads
                .iter()
                .map(|t| ThreadSummary {
                    regs: t.regs,
                    pc: t.pc,
                    instructions: t.retired,
                    halted: t.halted,
                })
                .collect(),
            timeline: self.timeline.clone(),
        }
    }
}

/// Final state of one hardware thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub regs: RegisterFile,
    pub pc: usize,
    /// Instructions committed by this thread
    pub instructions: u64,
    pub halted: bool,
}

/// Results of a completed run. Every accessor is a pure read.
///
/// `cycles == instructions + idle_cycles + switch_cycles` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub policy: String,
    pub cycles: u64,
    pub instructions: u64,
    pub idle_cycles: u64,
    /// Cycles spent paying switch penalties (blocked policy only)
    pub switch_cycles: u64,
    pub switches: u64,
    pub threads: Vec<ThreadSummary>,
    #[serde(default)]
    pub timeline: Option<Vec<CycleEvent>>,
}

impl RunStats {
    pub fn cpi(&self) -> f64 {
        cpi(self.cycles, self.instructions)
    }

    /// Copy of thread `tid`'s final register file.
    pub fn snapshot(&self, tid: usize) -> Result<RegisterFile> {
        self.threads
            .get(tid)
            .map(|t| t.regs)
            .ok_or(SimError::ThreadOutOfRange { tid, threads: self.threads.len() })
    }

    /// Thread ids in the order they committed instructions.
    /// Empty unless the run recorded a timeline.
    pub fn dispatch_order(&self) -> Vec<usize> {
        self.timeline
            .iter()
            .flatten()
            .filter_map(|e| match e {
                CycleEvent::Issue { tid, .. } => Some(*tid),
                _ => None,
            })
            .collect()
    }
}
