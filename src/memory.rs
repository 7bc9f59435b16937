/// In-process memory model.
/// Models the two memories a multithreaded core talks to:
///   - instruction memory: one program per hardware thread
///   - data memory: a single word-addressed space shared by all threads
/// and packages them, together with the timing configuration, as a `Machine`.

use std::collections::HashMap;

use tracing::warn;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::isa::RawInstruction;
use crate::machine::Machine;

/// Word-addressed data memory.
/// Uses a sparse map so the full 32-bit address space is available without
/// real allocation. Unwritten addresses read as zero.
#[derive(Debug, Clone, Default)]
pub struct DataMemory {
    data: HashMap<u32, i32>,
}

impl DataMemory {
    pub fn new() -> Self {
        DataMemory { data: HashMap::new() }
    }

    pub fn read(&self, addr: u32) -> i32 {
        *self.data.get(&addr).unwrap_or(&0)
    }

    pub fn write(&mut self, addr: u32, value: i32) {
        self.data.insert(addr, value);
    }

    /// Written locations in ascending address order.
    pub fn words(&self) -> Vec<(u32, i32)> {
        let mut words: Vec<(u32, i32)> = self.data.iter().map(|(&a, &v)| (a, v)).collect();
        words.sort_unstable_by_key(|&(a, _)| a);
        words
    }
}

/// Timing configuration + instruction memory + data memory.
#[derive(Debug, Clone)]
pub struct SimMachine {
    config: SimConfig,
    programs: Vec<Vec<RawInstruction>>,
    data: DataMemory,
}

impl SimMachine {
    pub fn new(config: SimConfig, programs: Vec<Vec<RawInstruction>>) -> Result<Self> {
        config.validate()?;
        if programs.len() != config.threads {
            return Err(SimError::InvalidConfig(format!(
                "{} programs supplied for {} threads",
                programs.len(),
                config.threads
            )));
        }
        Ok(SimMachine {
            config,
            programs,
            data: DataMemory::new(),
        })
    }

    pub fn data(&self) -> &DataMemory {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataMemory {
        &mut self.data
    }
}

impl Machine for SimMachine {
    fn thread_count(&self) -> usize {
        self.config.threads
    }

    fn load_latency(&self) -> u32 {
        self.config.load_latency
    }

    fn store_latency(&self) -> u32 {
        self.config.store_latency
    }

    fn switch_cycles(&self) -> u32 {
        self.config.switch_cycles
    }

    /// Running off the end of a program yields HALT.
    fn fetch(&mut self, pc: usize, tid: usize) -> RawInstruction {
        match self.programs[tid].get(pc) {
            Some(&ins) => ins,
            None => {
                warn!(tid, pc, "fetch past end of program, returning HALT");
                RawInstruction::halt()
            }
        }
    }

    fn read(&mut self, addr: u32) -> i32 {
        self.data.read(addr)
    }

    fn write(&mut self, addr: u32, value: i32) {
        self.data.write(addr, value);
    }
}
