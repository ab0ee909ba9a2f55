pub mod core;
pub mod demos;
pub mod tools;

// Re-export commonly used types
pub use crate::core::components::{
    behavior_fn, Behavior, BehaviorContext, EdgeTriggered, LeafBuilder, Part, PortSpec, RisingEdge,
    SchedulingCondition, StructureBuilder,
};
pub use crate::core::error::{Result, SimError};
pub use crate::core::event_queue::{EventQueue, EventSource, OverflowPolicy};
pub use crate::core::execution::{ConcurrencyMode, Observation, Simulation, SimulationConfig};
pub use crate::core::timer::Timer;
pub use crate::core::values::{Logic, Value, ValueType};
