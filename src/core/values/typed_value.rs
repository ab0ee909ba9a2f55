use super::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared value type of a port or event queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Logic,
    Float,
    Int,
}

/// Value carried by ports and event queues
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Logic(Logic),
    /// Wall-clock style timestamps, in seconds
    Float(f64),
    Int(i64),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Logic(_) => ValueType::Logic,
            Value::Float(_) => ValueType::Float,
            Value::Int(_) => ValueType::Int,
        }
    }

    pub fn as_logic(&self) -> Option<Logic> {
        match self {
            Value::Logic(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<Logic> for Value {
    fn from(value: Logic) -> Self {
        Value::Logic(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Logic => write!(f, "logic"),
            ValueType::Float => write!(f, "float"),
            ValueType::Int => write!(f, "int"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logic(l) => write!(f, "{}", l),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
        }
    }
}
