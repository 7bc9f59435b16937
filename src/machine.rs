/// The services a scheduler needs from the surrounding memory model.
///
/// Timing parameters are constant for the duration of a run. Latencies are
/// expressed purely through the issuing thread's delay counter, so none of
/// these calls is expected to block.
use crate::isa::RawInstruction;

pub trait Machine {
    /// Number of hardware threads (at least 1).
    fn thread_count(&self) -> usize;

    /// Extra cycles a LOAD keeps its thread stalled.
    fn load_latency(&self) -> u32;

    /// Extra cycles a STORE keeps its thread stalled.
    fn store_latency(&self) -> u32;

    /// Cycles charged by the blocked policy for a context switch.
    fn switch_cycles(&self) -> u32;

    /// Instruction at `pc` of thread `tid`.
    fn fetch(&mut self, pc: usize, tid: usize) -> RawInstruction;

    fn read(&mut self, addr: u32) -> i32;

    fn write(&mut self, addr: u32, value: i32);
}

impl<M: Machine + ?Sized> Machine for &mut M {
    fn thread_count(&self) -> usize {
        (**self).thread_count()
    }

    fn load_latency(&self) -> u32 {
        (**self).load_latency()
    }

    fn store_latency(&self) -> u32 {
        (**self).store_latency()
    }

    fn switch_cycles(&self) -> u32 {
        (**self).switch_cycles()
    }

    fn fetch(&mut self, pc: usize, tid: usize) -> RawInstruction {
        (**self).fetch(pc, tid)
    }

    fn read(&mut self, addr: u32) -> i32 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: i32) {
        (**self).write(addr, value)
    }
}
