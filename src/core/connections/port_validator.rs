use crate::core::components::port_specs::Direction;
use crate::core::components::ports::PortSet;
use crate::core::connections::manager::Endpoint;
use crate::core::error::{Result, SimError};

/// Direction and type checks for wires inside a structural part
pub struct PortValidator;

impl PortValidator {
    /// A master is an input of the structural part itself or an output of a child
    pub fn validate_source(endpoint: Endpoint, ports: &PortSet, name: &str) -> Result<()> {
        let required = match endpoint {
            Endpoint::Own { .. } => Direction::Input,
            Endpoint::Child { .. } => Direction::Output,
        };
        Self::check_direction(ports, name, required, "source")
    }

    /// A slave is an output of the structural part itself or an input of a child
    pub fn validate_destination(endpoint: Endpoint, ports: &PortSet, name: &str) -> Result<()> {
        let required = match endpoint {
            Endpoint::Own { .. } => Direction::Output,
            Endpoint::Child { .. } => Direction::Input,
        };
        Self::check_direction(ports, name, required, "destination")
    }

    pub fn validate_types(
        source: &PortSet,
        source_port: &str,
        destination: &PortSet,
        destination_port: &str,
    ) -> Result<()> {
        let from = source.get(source_port)?.value_type();
        let to = destination.get(destination_port)?.value_type();
        if from != to {
            return Err(SimError::TypeMismatch {
                port: format!("{}.{}", destination.owner(), destination_port),
                expected: to.to_string(),
                found: from.to_string(),
            });
        }
        Ok(())
    }

    fn check_direction(ports: &PortSet, name: &str, required: Direction, role: &str) -> Result<()> {
        let port = ports.get(name)?;
        if port.direction() != required {
            let valid: Vec<&str> = ports.by_direction(required).map(|p| p.name()).collect();
            return Err(SimError::InvalidConnection(format!(
                "port '{}' on part '{}' cannot be a wire {}. Valid {} ports: {:?}",
                name,
                ports.owner(),
                role,
                match required {
                    Direction::Input => "input",
                    Direction::Output => "output",
                },
                valid
            )));
        }
        Ok(())
    }
}
