use crate::core::components::ports::{Port, PortSet};
use crate::core::error::{Result, SimError};
use crate::core::event_queue::EventQueue;
use crate::core::trace::TraceSink;
use crate::core::values::{Logic, Value};

/// Behavior of a leaf part, invoked at most once per tick when its
/// scheduling condition holds.
pub trait Behavior: Send {
    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()>;

    /// Called from `Part::init`, after the ports were reset
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called from `Part::term`; release files and other resources here
    fn term(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable description of what the behavior does, one line per entry
    fn describe(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Adapter turning a closure into a `Behavior`
pub struct FnBehavior<F>(pub F);

impl<F> Behavior for FnBehavior<F>
where
    F: FnMut(&mut BehaviorContext<'_>) -> Result<()> + Send,
{
    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()> {
        (self.0)(ctx)
    }
}

/// Wrap a closure as a boxed behavior
pub fn behavior_fn<F>(f: F) -> Box<dyn Behavior>
where
    F: FnMut(&mut BehaviorContext<'_>) -> Result<()> + Send + 'static,
{
    Box::new(FnBehavior(f))
}

/// Everything a behavior may touch during one invocation
pub struct BehaviorContext<'a> {
    part: &'a str,
    tick: u64,
    ports: &'a mut PortSet,
    queues: &'a [EventQueue],
    tracer: &'a dyn TraceSink,
}

impl<'a> BehaviorContext<'a> {
    pub(crate) fn new(
        part: &'a str,
        tick: u64,
        ports: &'a mut PortSet,
        queues: &'a [EventQueue],
        tracer: &'a dyn TraceSink,
    ) -> Self {
        Self {
            part,
            tick,
            ports,
            queues,
            tracer,
        }
    }

    pub fn part_id(&self) -> &str {
        self.part
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports.get(name)
    }

    /// Current value; fails if the port holds none
    pub fn read(&self, name: &str) -> Result<Value> {
        self.ports
            .get(name)?
            .peek()
            .copied()
            .ok_or_else(|| SimError::NoValue {
                part: self.part.to_string(),
                port: name.to_string(),
            })
    }

    pub fn read_logic(&self, name: &str) -> Result<Logic> {
        let value = self.read(name)?;
        value.as_logic().ok_or_else(|| SimError::TypeMismatch {
            port: name.to_string(),
            expected: "logic".to_string(),
            found: value.value_type().to_string(),
        })
    }

    /// Current value, if any
    pub fn peek(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.ports.get(name)?.peek().copied())
    }

    pub fn is_updated(&self, name: &str) -> Result<bool> {
        Ok(self.ports.get(name)?.is_updated())
    }

    pub fn write(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ports.write(name, value.into())
    }

    pub fn queue(&self, name: &str) -> Result<&EventQueue> {
        self.queues
            .iter()
            .find(|q| q.name() == name)
            .ok_or_else(|| SimError::UnknownQueue {
                part: self.part.to_string(),
                queue: name.to_string(),
            })
    }

    pub fn pop(&self, queue: &str) -> Result<Value> {
        self.queue(queue)?.pop()
    }

    pub fn trace(&self, message: impl AsRef<str>) {
        self.tracer.trace(self.tick, self.part, message.as_ref());
    }

    pub fn trace_error(&self, message: impl AsRef<str>) {
        self.tracer.error(self.tick, self.part, message.as_ref());
    }
}
