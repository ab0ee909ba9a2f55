pub mod manager;
pub mod port_validator;

pub use manager::{ConnectionManager, ConnectionStats, Endpoint, EventWire, Wire};
pub use port_validator::PortValidator;
