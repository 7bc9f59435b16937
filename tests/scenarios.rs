use mtsim::config::{Scenario, SimConfig};
use mtsim::executor::{simulate, Run};
use mtsim::isa::{Operand, RawInstruction};
use mtsim::machine::Machine;
use mtsim::memory::SimMachine;
use mtsim::scheduler::SchedulingPolicy;
use mtsim::stats::{CycleEvent, RunStats};
use mtsim::SimError;

fn scenario(config: SimConfig, programs: Vec<Vec<RawInstruction>>) -> Scenario {
    Scenario { config, programs, memory: Vec::new() }
}

fn run(policy: SchedulingPolicy, scenario: &Scenario) -> RunStats {
    Run::new(policy, scenario.to_machine().unwrap())
        .unwrap()
        .with_timeline()
        .run()
        .unwrap()
}

/// Wraps a machine and records every fetch the core makes.
struct RecordingMachine {
    inner: SimMachine,
    fetches: Vec<(usize, usize)>,
}

impl Machine for RecordingMachine {
    fn thread_count(&self) -> usize {
        self.inner.thread_count()
    }

    fn load_latency(&self) -> u32 {
        self.inner.load_latency()
    }

    fn store_latency(&self) -> u32 {
        self.inner.store_latency()
    }

    fn switch_cycles(&self) -> u32 {
        self.inner.switch_cycles()
    }

    fn fetch(&mut self, pc: usize, tid: usize) -> RawInstruction {
        self.fetches.push((tid, pc));
        self.inner.fetch(pc, tid)
    }

    fn read(&mut self, addr: u32) -> i32 {
        self.inner.read(addr)
    }

    fn write(&mut self, addr: u32, value: i32) {
        self.inner.write(addr, value)
    }
}

#[test]
fn addi_then_halt_on_one_thread() {
    let s = scenario(
        SimConfig::default(),
        vec![vec![RawInstruction::addi(1, 0, 5), RawInstruction::halt()]],
    );
    for policy in SchedulingPolicy::ALL {
        let mut r = Run::new(policy, s.to_machine().unwrap()).unwrap();
        let stats = r.run().unwrap();
        assert_eq!(stats.cycles, 2, "{policy}");
        // HALT commits like any other instruction.
        assert_eq!(stats.instructions, 2, "{policy}");
        assert_eq!(r.snapshot(0).unwrap()[1], 5, "{policy}");
        assert_eq!(r.cpi().unwrap(), 1.0, "{policy}");
    }
}

#[test]
fn load_stall_absorbs_dispatch_cycle() {
    let config = SimConfig { load_latency: 3, ..SimConfig::default() };
    let s = scenario(
        config,
        vec![vec![RawInstruction::load(1, 0, Operand::Imm(0)), RawInstruction::halt()]],
    );
    for policy in SchedulingPolicy::ALL {
        let stats = run(policy, &s);
        // 1 (LOAD) + 3 (stall) + 1 (HALT)
        assert_eq!(stats.cycles, 5, "{policy}");
        assert_eq!(stats.idle_cycles, 3, "{policy}");
        assert_eq!(stats.instructions, 2, "{policy}");
        assert_eq!(stats.cpi(), 2.5, "{policy}");
        assert_eq!(
            stats.timeline.unwrap(),
            vec![
                CycleEvent::Issue { tid: 0, pc: 0 },
                CycleEvent::Idle,
                CycleEvent::Idle,
                CycleEvent::Idle,
                CycleEvent::Issue { tid: 0, pc: 1 },
            ]
        );
    }
}

#[test]
fn fine_grained_alternates_two_threads() {
    let program = vec![RawInstruction::nop(), RawInstruction::halt()];
    let s = scenario(
        SimConfig { threads: 2, ..SimConfig::default() },
        vec![program.clone(), program],
    );
    let stats = run(SchedulingPolicy::FineGrained, &s);
    assert_eq!(stats.dispatch_order(), vec![0, 1, 0, 1]);
    assert_eq!(stats.cycles, 4);
    assert_eq!(stats.instructions, 4);
    assert_eq!(stats.cpi(), 1.0);
}

#[test]
fn blocked_runs_each_thread_to_completion_without_stalls() {
    let program = vec![RawInstruction::nop(), RawInstruction::nop(), RawInstruction::halt()];
    let s = scenario(
        SimConfig { threads: 3, switch_cycles: 4, ..SimConfig::default() },
        vec![program.clone(), program.clone(), program],
    );
    let stats = run(SchedulingPolicy::Blocked, &s);
    assert_eq!(stats.dispatch_order(), vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
    assert_eq!(stats.switches, 2);
    assert_eq!(stats.cycles, 9 + 2 * 4);
}

#[test]
fn blocked_pays_more_than_fine_grained_on_memory_heavy_mix() {
    let program = vec![
        RawInstruction::load(1, 0, Operand::Imm(0)),
        RawInstruction::load(2, 0, Operand::Imm(1)),
        RawInstruction::halt(),
    ];
    let s = scenario(
        SimConfig { threads: 2, load_latency: 4, switch_cycles: 2, ..SimConfig::default() },
        vec![program.clone(), program],
    );
    let blocked = run(SchedulingPolicy::Blocked, &s);
    let fine = run(SchedulingPolicy::FineGrained, &s);
    assert_eq!(fine.cycles, 12);
    assert_eq!(blocked.cycles, 18);
    assert_eq!(blocked.instructions, fine.instructions);
}

#[test]
fn stores_are_visible_to_later_loads_across_threads() {
    // Thread 0 stores 77 to address 50; thread 1 spins on NOPs then loads it.
    let s = scenario(
        SimConfig { threads: 2, store_latency: 1, load_latency: 1, ..SimConfig::default() },
        vec![
            vec![
                RawInstruction::addi(1, 0, 77),
                RawInstruction::addi(2, 0, 50),
                RawInstruction::store(1, 2, Operand::Imm(0)),
                RawInstruction::halt(),
            ],
            vec![
                RawInstruction::nop(),
                RawInstruction::nop(),
                RawInstruction::nop(),
                RawInstruction::load(3, 0, Operand::Imm(50)),
                RawInstruction::halt(),
            ],
        ],
    );
    let mut machine = s.to_machine().unwrap();
    let stats = simulate(SchedulingPolicy::FineGrained, &mut machine).unwrap();
    assert_eq!(machine.data().read(50), 77);
    assert_eq!(stats.snapshot(1).unwrap()[3], 77);
}

#[test]
fn unknown_opcode_is_skipped_by_both_policies() {
    let s = scenario(
        SimConfig::default(),
        vec![vec![
            RawInstruction::unknown(200),
            RawInstruction::addi(2, 0, 3),
            RawInstruction::halt(),
        ]],
    );
    for policy in SchedulingPolicy::ALL {
        let stats = run(policy, &s);
        assert_eq!(stats.instructions, 3, "{policy}");
        assert_eq!(stats.snapshot(0).unwrap()[2], 3, "{policy}");
        assert_eq!(stats.threads[0].pc, 2, "{policy}");
    }
}

#[test]
fn fetches_follow_dispatch_order() {
    let s = scenario(
        SimConfig { threads: 2, load_latency: 2, switch_cycles: 1, ..SimConfig::default() },
        vec![
            vec![RawInstruction::load(1, 0, Operand::Imm(0)), RawInstruction::nop(), RawInstruction::halt()],
            vec![RawInstruction::addi(1, 0, 1), RawInstruction::halt()],
        ],
    );
    for policy in SchedulingPolicy::ALL {
        let mut machine = RecordingMachine { inner: s.to_machine().unwrap(), fetches: Vec::new() };
        let stats = Run::new(policy, &mut machine).unwrap().with_timeline().run().unwrap();
        let issued: Vec<(usize, usize)> = stats
            .timeline
            .unwrap()
            .into_iter()
            .filter_map(|e| match e {
                CycleEvent::Issue { tid, pc } => Some((tid, pc)),
                _ => None,
            })
            .collect();
        assert_eq!(machine.fetches, issued, "{policy}");
    }
}

#[test]
fn zero_threads_is_rejected() {
    let config = SimConfig { threads: 0, ..SimConfig::default() };
    assert!(matches!(
        SimMachine::new(config, Vec::new()),
        Err(SimError::InvalidConfig(_))
    ));
}
