use mtsim::config::{Scenario, SimConfig};
use mtsim::executor::Run;
use mtsim::isa::{Operand, RawInstruction};
use mtsim::metrics::{write_report, SimReport, REPORT_PATH};
use mtsim::scheduler::SchedulingPolicy;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Two threads: thread 0 adds two words from memory and stores the sum,
/// thread 1 does register-only arithmetic around a single store.
fn demo_scenario() -> Scenario {
    let adder = vec![
        RawInstruction::addi(1, 0, 100),
        RawInstruction::load(2, 1, Operand::Imm(0)),
        RawInstruction::load(3, 1, Operand::Imm(1)),
        RawInstruction::add(4, 2, 3),
        RawInstruction::store(4, 1, Operand::Imm(2)),
        RawInstruction::halt(),
    ];
    let counter = vec![
        RawInstruction::addi(1, 0, 10),
        RawInstruction::subi(2, 1, 3),
        RawInstruction::addi(3, 0, 200),
        RawInstruction::store(2, 3, Operand::Reg(0)),
        RawInstruction::sub(4, 1, 2),
        RawInstruction::halt(),
    ];
    Scenario {
        config: SimConfig {
            threads: 2,
            load_latency: 3,
            store_latency: 1,
            switch_cycles: 2,
        },
        programs: vec![adder, counter],
        memory: vec![(100, 20), (101, 22)],
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let (name, scenario) = match std::env::args().nth(1) {
        Some(path) => {
            let scenario = Scenario::from_json_file(&path)?;
            (path, scenario)
        }
        None => ("built-in demo".to_string(), demo_scenario()),
    };

    println!(
        "Scenario '{}': {} threads | load latency {} | store latency {} | switch penalty {}",
        name,
        scenario.config.threads,
        scenario.config.load_latency,
        scenario.config.store_latency,
        scenario.config.switch_cycles,
    );

    let mut report = SimReport::new(&name, scenario.config.clone());

    for policy in SchedulingPolicy::ALL {
        // Each policy gets its own data memory.
        let mut run = Run::new(policy, scenario.to_machine()?)?.with_timeline();
        let stats = run.run()?;

        println!(
            "{:>12}: {} cycles | {} instructions | {} idle | {} switch ({} switches)",
            run.policy().name(),
            stats.cycles,
            stats.instructions,
            stats.idle_cycles,
            stats.switch_cycles,
            stats.switches,
        );
        for tid in 0..scenario.config.threads {
            println!("{:>12}  thread {}: {:?}", "", tid, run.snapshot(tid)?);
        }
        println!("{:>12}  memory: {:?}", "", run.machine().data().words());
        println!("{:>12}  CPI = {:.4}", "", run.cpi()?);

        report.runs.push(stats);
    }

    write_report(&report)?;
    println!("Report written to {} (view with `cargo run --bin viz`)", REPORT_PATH);
    Ok(())
}
