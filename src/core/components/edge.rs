//! Rising-edge gating for synchronous behaviors.

use crate::core::components::behavior::{Behavior, BehaviorContext};
use crate::core::error::Result;
use crate::core::values::Logic;

/// Remembers the last observed level of one port and reports 0-like to
/// 1-like transitions.
#[derive(Debug, Clone)]
pub struct RisingEdge {
    port: String,
    previous: Logic,
}

impl RisingEdge {
    pub fn new(port: &str) -> Self {
        Self {
            port: port.to_string(),
            previous: Logic::U,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn previous(&self) -> Logic {
        self.previous
    }

    pub fn should_fire(&self, current: Logic) -> bool {
        self.previous.is_low() && current.is_high()
    }

    pub fn record(&mut self, current: Logic) {
        self.previous = current;
    }

    pub fn reset(&mut self) {
        self.previous = Logic::U;
    }
}

/// Runs the wrapped behavior only on a rising edge of the gate's port.
/// The gate records every observed value, whether or not the behavior fires.
pub struct EdgeTriggered<B> {
    gate: RisingEdge,
    inner: B,
}

impl<B: Behavior> EdgeTriggered<B> {
    pub fn new(port: &str, inner: B) -> Self {
        Self {
            gate: RisingEdge::new(port),
            inner,
        }
    }

    pub fn gate(&self) -> &RisingEdge {
        &self.gate
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: Behavior> Behavior for EdgeTriggered<B> {
    fn behavior(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<()> {
        let current = ctx
            .peek(self.gate.port())?
            .and_then(|v| v.as_logic())
            .unwrap_or(Logic::U);
        let fire = self.gate.should_fire(current);
        self.gate.record(current);
        if fire {
            self.inner.behavior(ctx)
        } else {
            Ok(())
        }
    }

    fn init(&mut self) -> Result<()> {
        self.gate.reset();
        self.inner.init()
    }

    fn term(&mut self) -> Result<()> {
        self.inner.term()
    }

    fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!("on rising_edge({}):", self.gate.port())];
        lines.extend(self.inner.describe().into_iter().map(|l| format!("    {}", l)));
        lines
    }
}
