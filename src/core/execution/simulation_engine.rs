use crate::core::components::part::{Part, TickContext};
use crate::core::components::port_specs::Direction;
use crate::core::error::{Result, SimError};
use crate::core::event_queue::{EventSource, Wakeup};
use crate::core::execution::config::SimulationConfig;
use crate::core::resolve::{resolve_part_mut, resolve_port, resolve_queue, PortPath};
use crate::core::trace::{LogTraceSink, TraceSink};
use crate::core::values::Value;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

/// A watched port value recorded at the end of a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub tick: u64,
    pub path: String,
    pub value: Value,
}

/// Owns a part tree and drives it tick by tick
pub struct Simulation {
    top: Part,
    config: SimulationConfig,
    tracer: Arc<dyn TraceSink>,
    thread_pool: Option<rayon::ThreadPool>,
    wakeup: Arc<Wakeup>,
    tick: u64,
    initialized: bool,
    injections: Vec<(PortPath, Value)>,
    watched: Vec<PortPath>,
    observations: Vec<Observation>,
}

impl Simulation {
    pub fn new(mut top: Part, config: SimulationConfig) -> Result<Self> {
        if let Some(mode) = config.concurrency_mode {
            top.set_strategy_recursive(mode);
        }

        let thread_pool = match config.thread_pool_size {
            Some(size) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(size)
                    .build()
                    .map_err(|e| SimError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            top,
            config,
            tracer: Arc::new(LogTraceSink),
            thread_pool,
            wakeup: Arc::new(Wakeup::new()),
            tick: 0,
            initialized: false,
            injections: Vec::new(),
            watched: Vec::new(),
            observations: Vec::new(),
        })
    }

    /// Replace the default log-backed trace sink
    pub fn with_tracer(mut self, tracer: Arc<dyn TraceSink>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn top(&self) -> &Part {
        &self.top
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Reset every port to its initial value and initialise all parts.
    /// Stimulus staged with `inject` is kept for the next tick.
    pub fn init(&mut self) -> Result<()> {
        self.top.init()?;
        self.top.install_wakeup(&self.wakeup);
        self.tick = 0;
        self.observations.clear();
        self.initialized = true;
        info!("Simulation '{}' initialized", self.top.id());
        debug!("Part tree:\n{}", self.top.tree());
        Ok(())
    }

    /// Terminate all parts, releasing files and other resources
    pub fn term(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        let result = self.top.term();
        let flushed = self.tracer.flush();
        info!("Simulation '{}' terminated after {} tick(s)", self.top.id(), self.tick);
        result.and(flushed)
    }

    /// Stage a stimulus write to an input port, applied at the start of the next tick
    pub fn inject(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let path = PortPath::parse(path)?;
        let port = resolve_port(&self.top, &path)?;
        if port.direction() != Direction::Input {
            return Err(SimError::InvalidConnection(format!(
                "stimulus can only be injected into input ports, '{}' is an output",
                path
            )));
        }
        self.injections.push((path, value.into()));
        Ok(())
    }

    /// Record the value of `path` after every tick in which it was updated
    pub fn watch(&mut self, path: &str) -> Result<()> {
        let path = PortPath::parse(path)?;
        resolve_port(&self.top, &path)?;
        if !self.watched.contains(&path) {
            self.watched.push(path);
        }
        Ok(())
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn take_observations(&mut self) -> Vec<Observation> {
        std::mem::take(&mut self.observations)
    }

    pub fn peek(&self, path: &str) -> Result<Option<Value>> {
        let path = PortPath::parse(path)?;
        Ok(resolve_port(&self.top, &path)?.peek().copied())
    }

    pub fn is_updated(&self, path: &str) -> Result<bool> {
        let path = PortPath::parse(path)?;
        Ok(resolve_port(&self.top, &path)?.is_updated())
    }

    /// Bind an external producer to the event queue at `queue` (root-relative path)
    pub fn connect_event_source(&mut self, source: &mut dyn EventSource, queue: &str) -> Result<()> {
        let path = PortPath::parse(queue)?;
        let queue = resolve_queue(&self.top, &path)?;
        queue.set_wakeup(Arc::clone(&self.wakeup));
        source.bind(queue.clone());
        debug!("Connected event source to '{}'", path);
        Ok(())
    }

    /// Staged stimulus or queued events waiting for a tick
    pub fn has_pending_work(&self) -> bool {
        !self.injections.is_empty() || self.top.has_queued_events()
    }

    /// Run one tick: reset per-tick flags, apply injections, resolve the part tree
    pub fn step(&mut self) -> Result<()> {
        if !self.initialized {
            self.init()?;
        }
        self.tick += 1;
        let tick = self.tick;
        debug!("Tick {} of '{}'", tick, self.top.id());

        self.top.begin_tick();
        for (path, value) in std::mem::take(&mut self.injections) {
            let part = resolve_part_mut(&mut self.top, path.parts())?;
            let index = part.ports.index_of(path.leaf())?;
            part.ports.receive(index, value)?;
        }

        let ctx = TickContext {
            tick,
            max_passes: self.config.max_passes,
            tracer: self.tracer.as_ref(),
        };
        let top = &mut self.top;
        let runnable = top.is_structural() || top.is_eligible();
        let result = if !runnable {
            Ok(())
        } else if let Some(pool) = &self.thread_pool {
            pool.install(|| top.run(&ctx))
        } else {
            top.run(&ctx)
        };
        if let Err(e) = result {
            error!("Tick {} of '{}' failed: {}", tick, self.top.id(), e);
            self.tracer.error(tick, self.top.id(), &e.to_string());
            return Err(e);
        }

        self.record_observations();
        Ok(())
    }

    fn record_observations(&mut self) {
        for path in &self.watched {
            if let Ok(port) = resolve_port(&self.top, path) {
                if port.is_updated() {
                    if let Some(value) = port.peek() {
                        self.observations.push(Observation {
                            tick: self.tick,
                            path: path.to_string(),
                            value: *value,
                        });
                    }
                }
            }
        }
    }

    /// Run `ticks` ticks, stopping at the first error
    pub fn run_ticks(&mut self, ticks: u64) -> Result<u64> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(self.tick)
    }

    /// Run until `stop` returns true, ticking whenever stimulus is pending
    /// and parking otherwise. `term()` is always called before returning;
    /// a tick error takes precedence over a termination error.
    pub fn run_until<F>(&mut self, mut stop: F) -> Result<u64>
    where
        F: FnMut(&Simulation) -> bool,
    {
        let result = self.run_loop(&mut stop);
        let terminated = self.term();
        result.and(terminated).map(|_| self.tick)
    }

    fn run_loop<F>(&mut self, stop: &mut F) -> Result<()>
    where
        F: FnMut(&Simulation) -> bool,
    {
        if !self.initialized {
            self.init()?;
        }
        let idle = Duration::from_millis(self.config.idle_wait_ms);
        while !stop(&*self) {
            if self.has_pending_work() {
                self.step()?;
            } else {
                self.wakeup.wait_timeout(idle);
            }
        }
        Ok(())
    }
}
