/// Simulation configuration and runnable scenarios.
///
/// A `SimConfig` carries the timing parameters the schedulers consume; a
/// `Scenario` adds one program per hardware thread and the initial contents of
/// data memory, and can be loaded from JSON:
///
/// ```json
/// {
///   "config":   { "threads": 2, "load_latency": 3, "store_latency": 1, "switch_cycles": 2 },
///   "programs": [[{ "opcode": 3, "dst": 1, "src2": 5, "imm": true }, { "opcode": 7 }],
///                [{ "opcode": 7 }]],
///   "memory":   [[100, 42]]
/// }
/// ```
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::isa::RawInstruction;
use crate::memory::SimMachine;

/// Timing parameters, constant for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of hardware threads (>= 1)
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Extra stall cycles after a LOAD
    #[serde(default)]
    pub load_latency: u32,
    /// Extra stall cycles after a STORE
    #[serde(default)]
    pub store_latency: u32,
    /// Context switch penalty of the blocked policy
    #[serde(default)]
    pub switch_cycles: u32,
}

fn default_threads() -> usize {
    1
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            threads: default_threads(),
            load_latency: 0,
            store_latency: 0,
            switch_cycles: 0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(SimError::InvalidConfig("thread count must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// A complete, runnable description of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: SimConfig,
    /// Program of each hardware thread, indexed by thread id
    pub programs: Vec<Vec<RawInstruction>>,
    /// Initial data memory as (address, value) pairs
    #[serde(default)]
    pub memory: Vec<(u32, i32)>,
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Build a fresh in-process machine with this scenario loaded.
    pub fn to_machine(&self) -> Result<SimMachine> {
        let mut machine = SimMachine::new(self.config.clone(), self.programs.clone())?;
        for &(addr, value) in &self.memory {
            machine.data_mut().write(addr, value);
        }
        Ok(machine)
    }
}
