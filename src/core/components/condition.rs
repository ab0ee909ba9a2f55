use crate::core::components::ports::PortSet;
use crate::core::error::{Result, SimError};
use crate::core::event_queue::EventQueue;
use std::fmt;
use std::sync::Arc;

/// Read-only view used to evaluate a scheduling condition
pub struct ConditionView<'a> {
    ports: &'a PortSet,
    queues: &'a [EventQueue],
}

impl<'a> ConditionView<'a> {
    pub(crate) fn new(ports: &'a PortSet, queues: &'a [EventQueue]) -> Self {
        Self { ports, queues }
    }

    /// Port updated this tick, or queue holding at least one event
    pub fn is_ready(&self, name: &str) -> bool {
        if let Ok(port) = self.ports.get(name) {
            return port.is_updated();
        }
        self.queues
            .iter()
            .any(|q| q.name() == name && !q.is_empty())
    }

    pub fn any_input_updated(&self) -> bool {
        self.ports.any_input_updated()
    }

    pub fn any_queue_pending(&self) -> bool {
        self.queues.iter().any(|q| !q.is_empty())
    }
}

pub type ConditionFn = dyn Fn(&ConditionView<'_>) -> bool + Send + Sync;

/// Predicate deciding whether a leaf part may run in the current tick
#[derive(Clone, Default)]
pub enum SchedulingCondition {
    /// Any input port updated or any event queue non-empty
    #[default]
    AnyUpdated,
    /// Every named port updated (or named queue non-empty)
    AllUpdated(Vec<String>),
    /// At least one named port updated (or named queue non-empty)
    AnyOf(Vec<String>),
    Custom(Arc<ConditionFn>),
}

impl SchedulingCondition {
    pub fn all_updated(names: &[&str]) -> Self {
        SchedulingCondition::AllUpdated(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn any_of(names: &[&str]) -> Self {
        SchedulingCondition::AnyOf(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&ConditionView<'_>) -> bool + Send + Sync + 'static,
    {
        SchedulingCondition::Custom(Arc::new(f))
    }

    /// Check that every referenced name is a port or queue of the part
    pub fn validate(&self, ports: &PortSet, queues: &[EventQueue]) -> Result<()> {
        let names = match self {
            SchedulingCondition::AllUpdated(names) | SchedulingCondition::AnyOf(names) => names,
            _ => return Ok(()),
        };
        for name in names {
            let known = ports.get(name).is_ok() || queues.iter().any(|q| q.name() == name);
            if !known {
                return Err(SimError::UnknownPort {
                    part: ports.owner().to_string(),
                    port: name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn is_satisfied(&self, view: &ConditionView<'_>) -> bool {
        match self {
            SchedulingCondition::AnyUpdated => view.any_input_updated() || view.any_queue_pending(),
            SchedulingCondition::AllUpdated(names) => {
                !names.is_empty() && names.iter().all(|n| view.is_ready(n))
            }
            SchedulingCondition::AnyOf(names) => names.iter().any(|n| view.is_ready(n)),
            SchedulingCondition::Custom(f) => f(view),
        }
    }
}

impl fmt::Debug for SchedulingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingCondition::AnyUpdated => write!(f, "AnyUpdated"),
            SchedulingCondition::AllUpdated(names) => write!(f, "AllUpdated({:?})", names),
            SchedulingCondition::AnyOf(names) => write!(f, "AnyOf({:?})", names),
            SchedulingCondition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::port_specs::PortSpec;
    use crate::core::event_queue::OverflowPolicy;
    use crate::core::values::{Logic, Value};

    fn ports() -> PortSet {
        PortSet::new(
            "dut",
            vec![
                PortSpec::input("clk"),
                PortSpec::input("rst"),
                PortSpec::output("out_0"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_any_updated_default() {
        let mut ports = ports();
        let queues: Vec<EventQueue> = vec![];
        let cond = SchedulingCondition::default();
        assert!(!cond.is_satisfied(&ConditionView::new(&ports, &queues)));
        ports.receive(1, Value::Logic(Logic::One)).unwrap();
        assert!(cond.is_satisfied(&ConditionView::new(&ports, &queues)));
    }

    #[test]
    fn test_any_updated_sees_queue() {
        let ports = ports();
        let queue = EventQueue::new("time", 1, OverflowPolicy::Reject).unwrap();
        queue.push(0.1).unwrap();
        let queues = vec![queue];
        assert!(SchedulingCondition::AnyUpdated.is_satisfied(&ConditionView::new(&ports, &queues)));
    }

    #[test]
    fn test_all_updated_requires_every_name() {
        let mut ports = ports();
        let queues: Vec<EventQueue> = vec![];
        let cond = SchedulingCondition::all_updated(&["clk", "rst"]);
        ports.receive(0, Value::Logic(Logic::One)).unwrap();
        assert!(!cond.is_satisfied(&ConditionView::new(&ports, &queues)));
        ports.receive(1, Value::Logic(Logic::Zero)).unwrap();
        assert!(cond.is_satisfied(&ConditionView::new(&ports, &queues)));
    }

    #[test]
    fn test_validate_rejects_unknown_names() {
        let ports = ports();
        let cond = SchedulingCondition::all_updated(&["clock"]);
        assert!(cond.validate(&ports, &[]).is_err());
        assert!(SchedulingCondition::all_updated(&["clk"]).validate(&ports, &[]).is_ok());
    }

    #[test]
    fn test_custom_condition() {
        let ports = ports();
        let cond = SchedulingCondition::custom(|view| !view.any_input_updated());
        assert!(cond.is_satisfied(&ConditionView::new(&ports, &[])));
    }
}
