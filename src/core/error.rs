//! Error types for the simulation core

use thiserror::Error;

/// Errors raised while building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A slave port received a second value within one tick
    #[error("Overwrite error: port '{port}' on part '{part}' already received a value this tick")]
    Overwrite { part: String, port: String },

    /// Pop on an empty event queue
    #[error("Event queue '{queue}' is empty")]
    EmptyQueue { queue: String },

    /// Push on a full event queue configured to reject
    #[error("Event queue '{queue}' is full (capacity {capacity})")]
    QueueFull { queue: String, capacity: usize },

    #[error("Event queue '{queue}' must have a capacity of at least 1")]
    InvalidCapacity { queue: String },

    /// Tick resolution did not reach a fixed point within the pass bound
    #[error("Part '{part}' did not settle within {passes} scheduling passes")]
    NonTermination { part: String, passes: usize },

    /// A dotted path could not be resolved against the part tree
    #[error("Cannot resolve '{path}': no '{segment}' found")]
    Resolution { path: String, segment: String },

    #[error("Port '{port}' not found on part '{part}'")]
    UnknownPort { part: String, port: String },

    #[error("Event queue '{queue}' not found on part '{part}'")]
    UnknownQueue { part: String, queue: String },

    #[error("Part '{part}' already has a {kind} named '{name}'")]
    DuplicateName {
        part: String,
        kind: &'static str,
        name: String,
    },

    /// Fan-in is forbidden on value propagation
    #[error("Port '{port}' already has a driver; multiple drivers not allowed")]
    MultipleDrivers { port: String },

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Type mismatch on '{port}': expected {expected}, found {found}")]
    TypeMismatch {
        port: String,
        expected: String,
        found: String,
    },

    #[error("Port '{port}' on part '{part}' holds no value")]
    NoValue { part: String, port: String },

    #[error("Part '{0}' is not structural")]
    NotStructural(String),

    #[error("Cycle detected in part dependencies: {0}")]
    DependencyCycle(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Failure reported by a user behavior
    #[error("Behavior of '{part}' failed: {message}")]
    Behavior { part: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
