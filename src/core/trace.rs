//! Part-level trace output.
//!
//! The simulation owns one `TraceSink` and lends it to every behavior
//! invocation. `Tracer` builds the sink from a `TraceConfig` before the run
//! loop and flushes it afterwards.

use crate::core::error::Result;
use log::LevelFilter;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination for trace and error messages emitted by parts
pub trait TraceSink: Send + Sync {
    fn trace(&self, tick: u64, part: &str, message: &str);

    fn error(&self, tick: u64, part: &str, message: &str);

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Forwards to the `log` facade under the `lsim::trace` target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn trace(&self, tick: u64, part: &str, message: &str) {
        log::info!(target: "lsim::trace", "[{}] {}: {}", tick, part, message);
    }

    fn error(&self, tick: u64, part: &str, message: &str) {
        log::error!(target: "lsim::trace", "[{}] {}: {}", tick, part, message);
    }
}

/// Writes trace lines and error lines to two separate files
pub struct FileTraceSink {
    trace: Mutex<BufWriter<File>>,
    errors: Mutex<BufWriter<File>>,
}

impl FileTraceSink {
    pub fn create(trace_path: &Path, error_path: &Path) -> Result<Self> {
        for path in [trace_path, error_path] {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)?;
                }
            }
        }
        Ok(Self {
            trace: Mutex::new(BufWriter::new(File::create(trace_path)?)),
            errors: Mutex::new(BufWriter::new(File::create(error_path)?)),
        })
    }

    fn write_line(target: &Mutex<BufWriter<File>>, tick: u64, part: &str, message: &str) {
        if let Err(e) = writeln!(target.lock(), "[{}] {}: {}", tick, part, message) {
            log::warn!("Failed to write trace line: {}", e);
        }
    }
}

impl TraceSink for FileTraceSink {
    fn trace(&self, tick: u64, part: &str, message: &str) {
        Self::write_line(&self.trace, tick, part, message);
    }

    fn error(&self, tick: u64, part: &str, message: &str) {
        Self::write_line(&self.errors, tick, part, message);
    }

    fn flush(&self) -> Result<()> {
        self.trace.lock().flush()?;
        self.errors.lock().flush()?;
        Ok(())
    }
}

/// Kind of a captured trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Trace,
    Error,
}

/// One captured trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub kind: TraceKind,
    pub tick: u64,
    pub part: String,
    pub message: String,
}

/// Keeps every message in memory; handy for tests
#[derive(Debug, Default, Clone)]
pub struct MemoryTraceSink {
    records: Arc<Mutex<Vec<TraceRecord>>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    fn push(&self, kind: TraceKind, tick: u64, part: &str, message: &str) {
        self.records.lock().push(TraceRecord {
            kind,
            tick,
            part: part.to_string(),
            message: message.to_string(),
        });
    }
}

impl TraceSink for MemoryTraceSink {
    fn trace(&self, tick: u64, part: &str, message: &str) {
        self.push(TraceKind::Trace, tick, part, message);
    }

    fn error(&self, tick: u64, part: &str, message: &str) {
        self.push(TraceKind::Error, tick, part, message);
    }
}

/// Drops trace lines when `level` is below `Info`. Error lines always pass.
pub struct LevelFilteredSink {
    level: LevelFilter,
    inner: Arc<dyn TraceSink>,
}

impl LevelFilteredSink {
    pub fn new(level: LevelFilter, inner: Arc<dyn TraceSink>) -> Self {
        Self { level, inner }
    }
}

impl TraceSink for LevelFilteredSink {
    fn trace(&self, tick: u64, part: &str, message: &str) {
        if self.level >= LevelFilter::Info {
            self.inner.trace(tick, part, message);
        }
    }

    fn error(&self, tick: u64, part: &str, message: &str) {
        self.inner.error(tick, part, message);
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }
}

/// Configuration for trace output
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub level: LevelFilter,
    pub trace_file: Option<PathBuf>,
    pub error_file: Option<PathBuf>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            trace_file: None,
            error_file: None,
        }
    }
}

impl TraceConfig {
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn with_files(mut self, trace_file: impl Into<PathBuf>, error_file: impl Into<PathBuf>) -> Self {
        self.trace_file = Some(trace_file.into());
        self.error_file = Some(error_file.into());
        self
    }
}

/// Explicit start/stop lifecycle around a trace sink
pub struct Tracer {
    sink: Arc<dyn TraceSink>,
}

impl Tracer {
    /// Build the sink described by `config`. File output is used when both
    /// paths are set; the level filter applies to either sink.
    pub fn start(config: &TraceConfig) -> Result<Self> {
        let sink: Arc<dyn TraceSink> = match (&config.trace_file, &config.error_file) {
            (Some(trace), Some(errors)) => Arc::new(FileTraceSink::create(trace, errors)?),
            _ => Arc::new(LogTraceSink),
        };
        log::debug!("Tracer started at level {}", config.level);
        Ok(Self {
            sink: Arc::new(LevelFilteredSink::new(config.level, sink)),
        })
    }

    pub fn from_sink(sink: Arc<dyn TraceSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> Arc<dyn TraceSink> {
        Arc::clone(&self.sink)
    }

    pub fn stop(self) -> Result<()> {
        self.sink.flush()
    }
}

/// Initialise `env_logger` with a default level, honouring `RUST_LOG`
pub fn init_logging(level: LevelFilter) {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .try_init();
}
