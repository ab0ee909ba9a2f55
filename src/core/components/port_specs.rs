use crate::core::values::{Logic, Value, ValueType};
use serde::{Deserialize, Serialize};

/// Direction of a port relative to its owning part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// Whether a port keeps its value across ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortSemantic {
    /// Retains the last value until overwritten
    #[default]
    Persistent,
    /// Value is discarded at the start of every tick
    Pulse,
}

/// What happens when a slave port receives a second value in one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    #[default]
    Reject,
    Allow,
}

/// Port specification used when declaring a part's interface
#[derive(Debug, Clone)]
pub struct PortSpec {
    /// Port name, unique within its part
    pub name: String,
    pub direction: Direction,
    pub value_type: ValueType,
    /// Value restored by `init()`
    pub init_value: Option<Value>,
    pub semantic: PortSemantic,
    pub overwrite: OverwritePolicy,
}

impl PortSpec {
    fn new(name: &str, direction: Direction) -> Self {
        Self {
            name: name.to_string(),
            direction,
            value_type: ValueType::Logic,
            init_value: Some(Value::Logic(Logic::U)),
            semantic: PortSemantic::Persistent,
            overwrite: OverwritePolicy::Reject,
        }
    }

    /// Create a new logic input port initialised to `U`
    pub fn input(name: &str) -> Self {
        Self::new(name, Direction::Input)
    }

    /// Create a new logic output port initialised to `U`
    pub fn output(name: &str) -> Self {
        Self::new(name, Direction::Output)
    }

    /// Declare the port as carrying floats, with no initial value
    pub fn float(mut self) -> Self {
        self.value_type = ValueType::Float;
        self.init_value = None;
        self
    }

    /// Declare the port as carrying integers, with no initial value
    pub fn int(mut self) -> Self {
        self.value_type = ValueType::Int;
        self.init_value = None;
        self
    }

    pub fn with_init(mut self, value: impl Into<Value>) -> Self {
        self.init_value = Some(value.into());
        self
    }

    pub fn without_init(mut self) -> Self {
        self.init_value = None;
        self
    }

    pub fn pulse(mut self) -> Self {
        self.semantic = PortSemantic::Pulse;
        self
    }

    pub fn allow_overwrite(mut self) -> Self {
        self.overwrite = OverwritePolicy::Allow;
        self
    }
}
