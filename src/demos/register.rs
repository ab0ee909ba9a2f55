//! Register testbench: a clock driven by timer events, a stimulus source,
//! the register under test and a sink, optionally dumped to VCD.

use crate::core::components::{
    Behavior, BehaviorContext, EdgeTriggered, LeafBuilder, Part, PortSpec, SchedulingCondition,
    StructureBuilder,
};
use crate::core::error::Result;
use crate::core::event_queue::{EventQueue, OverflowPolicy};
use crate::core::execution::ConcurrencyMode;
use crate::core::values::Logic;
use crate::tools::vcd::{VcdConfig, VcdTarget};
use std::time::Duration;

/// Queue of the testbench fed by the timer
pub const TIMER_QUEUE: &str = "timer_q";
/// Reset is held high for this many rising edges
pub const RESET_CYCLES: u64 = 5;
/// The source drives `ONE` on every `INPUT_PERIOD`-th rising edge
pub const INPUT_PERIOD: u64 = 4;
pub const TIMER_INTERVAL: Duration = Duration::from_millis(100);
pub const TIMER_DURATION: Duration = Duration::from_secs(3);

/// D flip-flop with synchronous, dominant reset
pub struct Register;

impl Behavior for Register {
    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()> {
        if ctx.read_logic("rst")? == Logic::One {
            ctx.write("out_0", Logic::Zero)
        } else {
            let value = ctx.read_logic("in_0")?;
            ctx.write("out_0", value)
        }
    }

    fn describe(&self) -> Vec<String> {
        vec![
            "if rst = '1' then out_0 <= '0';".to_string(),
            "else out_0 <= in_0;".to_string(),
        ]
    }
}

impl Register {
    pub fn part(id: &str) -> Result<Part> {
        LeafBuilder::new(id, "Register")
            .port(PortSpec::input("clk"))
            .port(PortSpec::input("rst"))
            .port(PortSpec::input("in_0"))
            .port(PortSpec::output("out_0"))
            .condition(SchedulingCondition::all_updated(&["clk"]))
            .build(Box::new(EdgeTriggered::new("clk", Register)))
    }
}

/// Toggles `clk` on every time event: U, 0, 1, 0, ...
pub struct Clock {
    state: Logic,
}

impl Clock {
    pub fn new() -> Self {
        Self { state: Logic::U }
    }

    pub fn part(id: &str) -> Result<Part> {
        LeafBuilder::new(id, "Clock")
            .port(PortSpec::output("clk"))
            .port(PortSpec::output("time_port").float())
            .queue(EventQueue::new("time", 1, OverflowPolicy::DropNewest)?)
            .build(Box::new(Self::new()))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Clock {
    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()> {
        if ctx.queue("time")?.is_empty() {
            return Ok(());
        }
        let time = ctx.pop("time")?;
        ctx.write("time_port", time)?;
        let next = if self.state == Logic::U { Logic::Zero } else { !self.state };
        ctx.write("clk", next)?;
        ctx.trace(format!("Clock@time {} -> drive clock {} -> {}", time, self.state, next));
        self.state = next;
        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        self.state = Logic::U;
        Ok(())
    }

    fn describe(&self) -> Vec<String> {
        vec!["clk <= not clk on every time event;".to_string()]
    }
}

/// Stimulus: reset for the first edges, then a periodic input pattern
pub struct Source {
    cycle: u64,
}

impl Source {
    pub fn new() -> Self {
        Self { cycle: 0 }
    }

    /// Values driven on `rst` and `out_0` at rising edge `cycle`
    pub fn stimulus(cycle: u64) -> (Logic, Logic) {
        let rst = if cycle < RESET_CYCLES { Logic::One } else { Logic::Zero };
        let data = if cycle % INPUT_PERIOD == 0 { Logic::One } else { Logic::Zero };
        (rst, data)
    }

    pub fn part(id: &str) -> Result<Part> {
        LeafBuilder::new(id, "Source")
            .port(PortSpec::input("clk"))
            .port(PortSpec::output("rst"))
            .port(PortSpec::output("out_0"))
            .condition(SchedulingCondition::all_updated(&["clk"]))
            .build(Box::new(EdgeTriggered::new("clk", Self::new())))
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Source {
    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()> {
        let (rst, data) = Self::stimulus(self.cycle);
        ctx.write("rst", rst)?;
        ctx.write("out_0", data)?;
        ctx.trace(format!("Source@cycle {} -> drive rst={}, out_0={}", self.cycle, rst, data));
        self.cycle += 1;
        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        self.cycle = 0;
        Ok(())
    }
}

/// Consumes the register output so that every value has a reader
pub struct Sink;

impl Sink {
    pub fn part(id: &str) -> Result<Part> {
        LeafBuilder::new(id, "Sink")
            .port(PortSpec::input("in_0"))
            .build(Box::new(Sink))
    }
}

impl Behavior for Sink {
    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()> {
        let value = ctx.read_logic("in_0")?;
        ctx.trace(format!("Sink -> Receive = {}", value));
        Ok(())
    }
}

/// Expected register output at rising edge `edge` (0-based)
pub fn expected_output(edge: u64) -> Logic {
    let (rst, data) = Source::stimulus(edge);
    if rst == Logic::One {
        Logic::Zero
    } else {
        data
    }
}

/// Signals recorded by the testbench waveform
pub fn waveform_config(target: VcdTarget) -> VcdConfig {
    VcdConfig::new(target, "clock.time_port")
        .signal("clock.clk", "clock.clk")
        .signal("source.rst", "source.rst")
        .signal("dut.in_0", "source.out_0")
        .signal("dut.out_0", "dut.out_0")
}

/// Build the register testbench. Push timestamps into `timer_q` to advance it.
pub fn testbench(id: &str, waveform: Option<VcdConfig>) -> Result<Part> {
    let mut builder = StructureBuilder::new(id, "Testbench")
        .strategy(ConcurrencyMode::Sequential)
        .queue(EventQueue::new(TIMER_QUEUE, 1, OverflowPolicy::DropNewest)?)?
        .add_part(Clock::part("clock")?)?
        .add_part(Source::part("source")?)?
        .add_part(Register::part("dut")?)?
        .add_part(Sink::part("sink")?)?
        .wire_event(TIMER_QUEUE, "clock.time")?
        .wire("clock.clk", "source.clk")?
        .wire("clock.clk", "dut.clk")?
        .wire("source.rst", "dut.rst")?
        .wire("source.out_0", "dut.in_0")?
        .wire("dut.out_0", "sink.in_0")?;
    if let Some(config) = waveform {
        builder = builder.attach_vcd_monitor(config);
    }
    builder.build()
}
