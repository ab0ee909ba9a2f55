use lsim::core::trace::{MemoryTraceSink, TraceKind};
use lsim::demos::register::{self, expected_output, Register, TIMER_QUEUE};
use lsim::tools::codegen::{generate_code, CodegenOptions};
use lsim::tools::diagram::{export_part, import_document, BlockDiagram, DiagramDocument};
use lsim::core::values::VcdBit;
use lsim::tools::vcd::{parse_vcd, SharedBuffer, VcdTarget};
use lsim::{
    ConcurrencyMode, Logic, Observation, Part, PortSpec, Simulation, SimulationConfig, StructureBuilder,
    Timer, Value,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

/// Seconds between two clock events; exact in binary so timestamps are exact
const STEP: f64 = 0.125;

/// Push one time event per tick and step the testbench `ticks` times
fn drive(sim: &mut Simulation, ticks: u64) {
    let queue = sim.top().queue(TIMER_QUEUE).unwrap().clone();
    for tick in 1..=ticks {
        queue.push(tick as f64 * STEP).unwrap();
        sim.step().unwrap();
    }
}

#[test]
fn test_register_follows_input_after_reset() {
    let mut sim = Simulation::new(register::testbench("tb", None).unwrap(), SimulationConfig::default()).unwrap();
    sim.watch("dut.out_0").unwrap();
    drive(&mut sim, 30);

    // rising edges happen on even ticks: U->0 on tick 1, 0->1 on tick 2
    let outputs: Vec<(u64, Value)> = sim
        .observations()
        .iter()
        .map(|o| (o.tick, o.value))
        .collect();
    let expected: Vec<(u64, Value)> = (0..15)
        .map(|edge| (2 * (edge + 1), Value::Logic(expected_output(edge))))
        .collect();
    assert_eq!(outputs, expected);
    assert_eq!(sim.peek("sink.in_0").unwrap(), sim.peek("dut.out_0").unwrap());
}

#[test]
fn test_register_traces_every_stage() {
    let sink = MemoryTraceSink::new();
    let mut sim = Simulation::new(register::testbench("tb", None).unwrap(), SimulationConfig::default())
        .unwrap()
        .with_tracer(Arc::new(sink.clone()));
    drive(&mut sim, 4);

    let by_part = |part: &str| sink.records().iter().filter(|r| r.part == part).count();
    assert_eq!(by_part("clock"), 4, "One clock trace per time event");
    assert_eq!(by_part("source"), 2, "Source fires on the two rising edges");
    assert_eq!(by_part("sink"), 2);
    assert!(sink.records().iter().all(|r| r.kind == TraceKind::Trace));
}

#[test]
fn test_waveform_records_register_output() {
    let buffer = SharedBuffer::new();
    let waveform = register::waveform_config(VcdTarget::Buffer(buffer.clone())).with_date("fixed");
    let mut sim = Simulation::new(register::testbench("tb", Some(waveform)).unwrap(), SimulationConfig::default()).unwrap();
    drive(&mut sim, 20);
    sim.term().unwrap();

    let dump = parse_vcd(&buffer.contents()).unwrap();
    let names: Vec<&str> = dump.signals.iter().map(|(_, n)| n.as_str()).collect();
    assert_eq!(names, vec!["clock.clk", "source.rst", "dut.in_0", "dut.out_0"]);

    let out: Vec<(u64, VcdBit)> = dump
        .changes
        .iter()
        .filter(|c| c.signal == "dut.out_0")
        .map(|c| (c.timestamp, c.bit))
        .collect();
    let expected: Vec<(u64, VcdBit)> = (0..10)
        .map(|edge| (250 * (edge + 1), expected_output(edge).to_vcd_bit()))
        .collect();
    assert_eq!(out, expected);

    let clock_changes = dump.changes.iter().filter(|c| c.signal == "clock.clk").count();
    assert_eq!(clock_changes, 20);
}

#[test]
fn test_rayon_strategy_produces_identical_waveform() {
    let run = |mode: ConcurrencyMode| {
        let buffer = SharedBuffer::new();
        let waveform = register::waveform_config(VcdTarget::Buffer(buffer.clone())).with_date("fixed");
        let config = SimulationConfig::new().with_concurrency(mode).with_thread_pool_size(4);
        let mut sim = Simulation::new(register::testbench("tb", Some(waveform)).unwrap(), config).unwrap();
        sim.watch("dut.out_0").unwrap();
        sim.watch("sink.in_0").unwrap();
        drive(&mut sim, 24);
        let observations = sim.take_observations();
        sim.term().unwrap();
        (observations, buffer.contents())
    };

    let (sequential_obs, sequential_vcd) = run(ConcurrencyMode::Sequential);
    let (parallel_obs, parallel_vcd) = run(ConcurrencyMode::Rayon);
    assert!(!sequential_obs.is_empty());
    assert_eq!(sequential_obs, parallel_obs);
    assert_eq!(sequential_vcd, parallel_vcd);
}

/// Two-stage shift register driven from its own ports
fn shift_register(mode: ConcurrencyMode) -> Part {
    StructureBuilder::new("top", "Shift")
        .strategy(mode)
        .port(PortSpec::input("clk"))
        .unwrap()
        .port(PortSpec::input("rst"))
        .unwrap()
        .port(PortSpec::input("d"))
        .unwrap()
        .port(PortSpec::output("q"))
        .unwrap()
        .add_part(Register::part("r1").unwrap())
        .unwrap()
        .add_part(Register::part("r2").unwrap())
        .unwrap()
        .wire("clk", "r1.clk")
        .unwrap()
        .wire("clk", "r2.clk")
        .unwrap()
        .wire("rst", "r1.rst")
        .unwrap()
        .wire("rst", "r2.rst")
        .unwrap()
        .wire("d", "r1.in_0")
        .unwrap()
        .wire("r1.out_0", "r2.in_0")
        .unwrap()
        .wire("r2.out_0", "q")
        .unwrap()
        .build()
        .unwrap()
}

fn random_run(seed: u64, mode: ConcurrencyMode) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sim = Simulation::new(shift_register(mode), SimulationConfig::default()).unwrap();
    sim.watch("r1.out_0").unwrap();
    sim.watch("q").unwrap();
    for _ in 0..200 {
        let clk = if rng.gen_bool(0.5) { Logic::One } else { Logic::Zero };
        let rst = if rng.gen_bool(0.1) { Logic::One } else { Logic::Zero };
        let d = Logic::ALL[rng.gen_range(0..Logic::ALL.len())];
        sim.inject("clk", clk).unwrap();
        sim.inject("rst", rst).unwrap();
        sim.inject("d", d).unwrap();
        sim.step().unwrap();
    }
    sim.take_observations()
}

#[test]
fn test_identical_stimulus_gives_identical_observations() {
    let first = random_run(7, ConcurrencyMode::Sequential);
    let second = random_run(7, ConcurrencyMode::Sequential);
    assert!(!first.is_empty(), "Random clock should produce rising edges");
    assert_eq!(first, second);
    assert_eq!(first, random_run(7, ConcurrencyMode::Rayon));
}

#[test]
fn test_timer_drives_run_until() {
    let sink = MemoryTraceSink::new();
    let config = SimulationConfig::new().with_idle_wait_ms(2);
    let mut sim = Simulation::new(register::testbench("tb", None).unwrap(), config)
        .unwrap()
        .with_tracer(Arc::new(sink.clone()));
    let mut timer = Timer::new("timer", Duration::from_millis(10), Duration::from_millis(200));
    sim.connect_event_source(&mut timer, TIMER_QUEUE).unwrap();

    sim.init().unwrap();
    timer.start();
    let ticks = sim
        .run_until(|s| timer.is_finished() && !s.has_pending_work())
        .unwrap();
    timer.join();

    assert!(ticks > 0, "Timer events should have driven at least one tick");
    assert!(!sim.is_initialized(), "run_until terminates the simulation");
    let clock_traces = sink.records().iter().filter(|r| r.part == "clock").count() as u64;
    assert_eq!(clock_traces, ticks, "Every tick was caused by exactly one time event");
}

#[test]
fn test_diagram_round_trip_of_testbench() {
    let testbench = register::testbench("tb", None).unwrap();
    let json = export_part(&testbench).unwrap().to_json().unwrap();
    let document = DiagramDocument::from_json(&json).unwrap();

    let ids: Vec<&str> = document.part.inner_parts.iter().map(|p| p.identifier.as_str()).collect();
    assert_eq!(ids, vec!["clock", "source", "dut", "sink"]);
    assert_eq!(document.part.connections.len(), 5);

    let mut canvas = BlockDiagram::new();
    let report = import_document(&document, &mut canvas);
    assert_eq!(report.blocks, 4);
    assert_eq!(report.wires, 5);
    assert_eq!(report.skipped_wires, 0);
    assert!(canvas
        .wire_labels()
        .contains(&("source (Source).out_0".to_string(), "dut (Register).in_0".to_string())));
}

#[test]
fn test_register_vhdl_template() {
    let dut = Register::part("dut").unwrap();
    let text = generate_code(&dut, &CodegenOptions::default(), None).unwrap();
    assert!(text.contains("entity register is"));
    assert!(text.contains("rst : in STD_LOGIC"));
    assert!(text.contains("out_0 : out STD_LOGIC"));
    assert!(text.contains("-- on rising_edge(clk):"));
    assert!(text.contains("architecture rtl of register is"));
}
