//! Value Change Dump output for monitored logic signals.
//!
//! `VcdMonitor` is an ordinary leaf behavior: one float `time` port plus one
//! logic port per signal. `StructureBuilder::attach_vcd_monitor` adds it as
//! the last child of a structural part and wires it from the configured paths.

use crate::core::components::behavior::{Behavior, BehaviorContext};
use crate::core::components::builder::LeafBuilder;
use crate::core::components::part::Part;
use crate::core::components::port_specs::PortSpec;
use crate::core::error::Result;
use crate::core::values::VcdBit;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use vcd_ng::{
    FFValueChange, FastFlow, FastFlowToken, IdCode, Parser, ScopeItem, SimulationCommand, TimescaleUnit,
    Value,
};

/// Identifier given to an attached monitor
pub const MONITOR_ID: &str = "vcd_monitor";

const TIME_PORT: &str = "time";

/// In-memory sink shared between a monitor and whoever reads the dump
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum VcdTarget {
    File(PathBuf),
    Buffer(SharedBuffer),
}

/// What to record and where
#[derive(Debug, Clone)]
pub struct VcdConfig {
    pub target: VcdTarget,
    /// Path of the float port carrying the time in seconds, e.g. `clock.time_port`
    pub time_source: String,
    /// `(vcd signal name, source port path)` in declaration order
    pub signals: Vec<(String, String)>,
    /// Fixed `$date` text; the current time is used when unset
    pub date: Option<String>,
}

impl VcdConfig {
    pub fn new(target: VcdTarget, time_source: &str) -> Self {
        Self {
            target,
            time_source: time_source.to_string(),
            signals: Vec::new(),
            date: None,
        }
    }

    pub fn signal(mut self, name: &str, source: &str) -> Self {
        self.signals.push((name.to_string(), source.to_string()));
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }
}

/// Streaming VCD writer over `vcd_ng::Writer`
pub struct VcdWriter<W: Write> {
    writer: vcd_ng::Writer<W>,
    ids: Vec<IdCode>,
    last_timestamp: Option<u64>,
}

impl<W: Write> VcdWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: vcd_ng::Writer::new(out),
            ids: Vec::new(),
            last_timestamp: None,
        }
    }

    /// Write the declaration block: one 1-bit wire per name under module `top`
    pub fn write_header(&mut self, date: &str, names: &[String]) -> io::Result<()> {
        self.writer.date(date)?;
        self.writer.version("lsim VCD monitor")?;
        self.writer.timescale(1, TimescaleUnit::MS)?;
        self.writer.add_module("top")?;
        self.ids = names
            .iter()
            .map(|name| self.writer.add_wire(1, name))
            .collect::<io::Result<_>>()?;
        self.writer.upscope()?;
        self.writer.enddefinitions()?;
        self.writer.begin(SimulationCommand::Dumpvars)?;
        self.writer.end()
    }

    /// Emit `#<ms>` if it is later than the last timestamp written
    pub fn timestamp(&mut self, millis: u64) -> io::Result<bool> {
        if self.last_timestamp.map_or(false, |last| millis <= last) {
            return Ok(false);
        }
        self.writer.timestamp(millis)?;
        self.last_timestamp = Some(millis);
        Ok(true)
    }

    pub fn change(&mut self, signal: usize, bit: VcdBit) -> io::Result<()> {
        let id = *self.ids.get(signal).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("signal index {} not declared", signal),
            )
        })?;
        let value = match bit {
            VcdBit::Zero => Value::V0,
            VcdBit::One => Value::V1,
            VcdBit::X => Value::X,
            VcdBit::Z => Value::Z,
        };
        self.writer.change_scalar(id, value)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Monitor behavior writing every updated signal at the current time
pub struct VcdMonitor {
    target: VcdTarget,
    date: Option<String>,
    names: Vec<String>,
    ports: Vec<String>,
    writer: Option<VcdWriter<Box<dyn Write + Send>>>,
}

impl VcdMonitor {
    /// Port name used for a signal; dots are not allowed in port names
    pub fn port_name(signal: &str) -> String {
        signal.replace('.', "_")
    }

    pub fn new(config: &VcdConfig) -> Self {
        Self {
            target: config.target.clone(),
            date: config.date.clone(),
            names: config.signals.iter().map(|(name, _)| name.clone()).collect(),
            ports: config
                .signals
                .iter()
                .map(|(name, _)| Self::port_name(name))
                .collect(),
            writer: None,
        }
    }

    /// Leaf part wrapping a monitor, with the time port and one port per signal
    pub fn part(id: &str, config: &VcdConfig) -> Result<Part> {
        let monitor = Self::new(config);
        let mut builder = LeafBuilder::new(id, "VcdMonitor").port(PortSpec::input(TIME_PORT).float());
        for port in &monitor.ports {
            builder = builder.port(PortSpec::input(port));
        }
        builder.build(Box::new(monitor))
    }

    fn open(&self) -> Result<Box<dyn Write + Send>> {
        Ok(match &self.target {
            VcdTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Box::new(BufWriter::new(File::create(path)?))
            }
            VcdTarget::Buffer(buffer) => Box::new(buffer.clone()),
        })
    }

    fn date(&self) -> String {
        match &self.date {
            Some(date) => date.clone(),
            None => {
                let secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                format!("{} seconds since the Unix epoch", secs)
            }
        }
    }
}

impl Behavior for VcdMonitor {
    fn init(&mut self) -> Result<()> {
        let mut writer = VcdWriter::new(self.open()?);
        writer.write_header(&self.date(), &self.names)?;
        self.writer = Some(writer);
        Ok(())
    }

    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let Some(time) = ctx.peek(TIME_PORT)?.and_then(|v| v.as_float()) else {
            return Ok(());
        };
        writer.timestamp((time * 1000.0) as u64)?;
        for (index, port) in self.ports.iter().enumerate() {
            if ctx.is_updated(port)? {
                let bit = ctx.read_logic(port)?.to_vcd_bit();
                writer.change(index, bit)?;
            }
        }
        Ok(())
    }

    fn term(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn describe(&self) -> Vec<String> {
        vec![format!("dump {} signal(s) as VCD", self.names.len())]
    }
}

#[derive(Debug, Error)]
pub enum VcdParseError {
    #[error("VCD read failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid value change '{bits}' for '{id}'")]
    BadValue { id: String, bits: String },

    #[error("undeclared identifier '{id}'")]
    UnknownId { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcdChange {
    pub timestamp: u64,
    pub signal: String,
    pub bit: VcdBit,
}

/// Parsed dump: declared `(id, name)` pairs and the ordered changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcdDump {
    pub signals: Vec<(String, String)>,
    pub changes: Vec<VcdChange>,
}

/// Declared wires keyed by identifier code: `(printed id, reference name)`
fn collect_vars(items: &[ScopeItem], vars: &mut IndexMap<u64, (String, String)>) {
    for item in items {
        if let ScopeItem::Scope(scope) = item {
            collect_vars(&scope.children, vars);
        } else if let ScopeItem::Var(var) = item {
            vars.insert(var.code.0, (var.code.to_string(), var.reference.to_string()));
        }
    }
}

/// Parse VCD text of the shape written by `VcdWriter`: declarations come
/// from the header, scalar changes from the body.
/// Changes before the first timestamp are reported at time 0.
pub fn parse_vcd(text: &str) -> std::result::Result<VcdDump, VcdParseError> {
    let header = Parser::new(text.as_bytes()).parse_header()?;
    let mut vars = IndexMap::new();
    collect_vars(&header.items, &mut vars);

    let mut dump = VcdDump {
        signals: vars.values().cloned().collect(),
        changes: Vec::new(),
    };

    let mut flow = FastFlow::new(text.as_bytes(), 65536);
    let mut timestamp = 0;
    while let Some(token) = flow.next_token()? {
        match token {
            FastFlowToken::Timestamp(t) => timestamp = t,
            FastFlowToken::Value(FFValueChange { id, bits }) => {
                let (_, signal) = vars
                    .get(&id.0)
                    .cloned()
                    .ok_or_else(|| VcdParseError::UnknownId { id: id.to_string() })?;
                let bits: &[u8] = bits.as_ref();
                let bit = match bits {
                    [b] => VcdBit::from_char(*b as char),
                    _ => None,
                }
                .ok_or_else(|| VcdParseError::BadValue {
                    id: id.to_string(),
                    bits: String::from_utf8_lossy(bits).into_owned(),
                })?;
                dump.changes.push(VcdChange {
                    timestamp,
                    signal,
                    bit,
                });
            }
        }
    }
    Ok(dump)
}
