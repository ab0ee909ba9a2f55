//! Command line driver for the register testbench.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};
use lsim::core::trace::{init_logging, TraceConfig, Tracer};
use lsim::demos::register::{self, Register, TIMER_QUEUE};
use lsim::tools::codegen::{generate_code, CodegenOptions};
use lsim::tools::diagram::{export_part, import_document, BlockDiagram, DiagramDocument};
use lsim::tools::vcd::VcdTarget;
use lsim::{Simulation, SimulationConfig, Timer};

#[derive(Parser)]
#[command(name = "register_testbench", about = "Register testbench on the lsim scheduling core")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the testbench against a wall-clock timer.
    ///
    /// The timer pushes the elapsed time into the testbench queue; every
    /// event toggles the clock once.
    Simulate(SimulateArgs),

    /// Export the testbench topology as diagram JSON.
    Diagram(DiagramArgs),

    /// Print a VHDL module for the register under test.
    Vhdl(VhdlArgs),
}

#[derive(Parser)]
struct SimulateArgs {
    /// Waveform output path.
    #[arg(long, default_value = "logs/waveforms.vcd")]
    vcd: PathBuf,

    /// Do not record a waveform.
    #[arg(long)]
    no_vcd: bool,

    /// Simulation configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Part trace output; requires --error-file.
    #[arg(long, requires = "error_file")]
    trace_file: Option<PathBuf>,

    /// Part error output; requires --trace-file.
    #[arg(long, requires = "trace_file")]
    error_file: Option<PathBuf>,

    /// Timer interval in milliseconds.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Timer duration in milliseconds.
    #[arg(long, default_value_t = 3000)]
    duration_ms: u64,
}

#[derive(Parser)]
struct DiagramArgs {
    /// Write the JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also import the document into an in-memory canvas and report what was created.
    #[arg(long)]
    check_import: bool,
}

#[derive(Parser)]
struct VhdlArgs {
    /// Target language; only VHDL is supported.
    #[arg(long, default_value = "VHDL")]
    language: String,

    /// Entity name; defaults to the lowercased class name.
    #[arg(long)]
    entity: Option<String>,

    /// Architecture name.
    #[arg(long, default_value = "rtl")]
    architecture: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.parse().unwrap_or(LevelFilter::Info));

    let result = match cli.command {
        Commands::Simulate(args) => cmd_simulate(args),
        Commands::Diagram(args) => cmd_diagram(args),
        Commands::Vhdl(args) => cmd_vhdl(args),
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn cmd_simulate(args: SimulateArgs) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    let waveform = (!args.no_vcd).then(|| register::waveform_config(VcdTarget::File(args.vcd.clone())));
    let testbench = register::testbench("tb", waveform)?;

    let mut trace_config = TraceConfig::default();
    if let (Some(trace), Some(errors)) = (&args.trace_file, &args.error_file) {
        trace_config = trace_config.with_files(trace, errors);
    }
    let tracer = Tracer::start(&trace_config)?;

    let mut sim = Simulation::new(testbench, config)?.with_tracer(tracer.sink());
    let mut timer = Timer::new(
        "timer",
        Duration::from_millis(args.interval_ms),
        Duration::from_millis(args.duration_ms),
    );
    sim.connect_event_source(&mut timer, TIMER_QUEUE)?;

    info!("Running testbench for {} ms", args.duration_ms);
    sim.init()?;
    timer.start();
    let run = sim.run_until(|s| timer.is_finished() && !s.has_pending_work());
    timer.stop();
    timer.join();
    let stopped = tracer.stop();

    let ticks = run?;
    stopped?;
    info!("Simulation finished after {} tick(s)", ticks);
    if !args.no_vcd {
        info!("Waveform written to {}", args.vcd.display());
    }
    Ok(())
}

fn cmd_diagram(args: DiagramArgs) -> Result<(), Box<dyn Error>> {
    let testbench = register::testbench("tb", None)?;
    let document = export_part(&testbench)?;
    let json = document.to_json()?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            info!("Diagram written to {}", path.display());
        }
        None => println!("{}", json),
    }

    if args.check_import {
        let parsed = DiagramDocument::from_json(&json)?;
        let mut canvas = BlockDiagram::new();
        let report = import_document(&parsed, &mut canvas);
        info!(
            "Imported {} pin(s), {} block(s), {} wire(s), skipped {}",
            report.pins, report.blocks, report.wires, report.skipped_wires
        );
    }
    Ok(())
}

fn cmd_vhdl(args: VhdlArgs) -> Result<(), Box<dyn Error>> {
    let dut = Register::part("dut")?;
    let options = CodegenOptions {
        language: args.language,
        entity_name: args.entity,
        architecture_name: args.architecture,
    };
    println!("{}", generate_code(&dut, &options, None)?);
    Ok(())
}
