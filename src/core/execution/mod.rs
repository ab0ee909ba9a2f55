pub mod config;
pub mod execution_order;
pub(crate) mod scheduler;
pub mod simulation_engine;

// Re-export commonly used types
pub use config::{ConcurrencyMode, ConfigError, SimulationConfig};
pub use execution_order::ExecutionOrderBuilder;
pub use simulation_engine::{Observation, Simulation};
