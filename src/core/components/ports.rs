use crate::core::components::port_specs::{Direction, OverwritePolicy, PortSemantic, PortSpec};
use crate::core::error::{Result, SimError};
use crate::core::values::{Value, ValueType};
use indexmap::IndexMap;

/// Runtime state of one port
#[derive(Debug, Clone)]
pub struct Port {
    spec: PortSpec,
    current: Option<Value>,
    previous: Option<Value>,
    /// Set when the port received a value this tick; reset only at the next tick start
    updated: bool,
    /// Written but not yet propagated along wiring
    dirty: bool,
}

impl Port {
    pub fn new(spec: PortSpec) -> Self {
        let current = spec.init_value;
        Self {
            spec,
            current,
            previous: None,
            updated: false,
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn direction(&self) -> Direction {
        self.spec.direction
    }

    pub fn value_type(&self) -> ValueType {
        self.spec.value_type
    }

    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }

    /// Current value, without side effects
    pub fn peek(&self) -> Option<&Value> {
        self.current.as_ref()
    }

    /// Value held before the most recent write
    pub fn previous(&self) -> Option<&Value> {
        self.previous.as_ref()
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Restore the initial value and clear all flags
    pub fn reset(&mut self) {
        self.current = self.spec.init_value;
        self.previous = None;
        self.updated = false;
        self.dirty = false;
    }

    pub(crate) fn begin_tick(&mut self) {
        self.updated = false;
        self.dirty = false;
        if self.spec.semantic == PortSemantic::Pulse {
            self.current = None;
        }
    }

    fn check_type(&self, value: &Value) -> Result<()> {
        if value.value_type() != self.spec.value_type {
            return Err(SimError::TypeMismatch {
                port: self.spec.name.clone(),
                expected: self.spec.value_type.to_string(),
                found: value.value_type().to_string(),
            });
        }
        Ok(())
    }

    fn store(&mut self, value: Value) {
        self.previous = self.current.take();
        self.current = Some(value);
        self.updated = true;
        self.dirty = true;
    }
}

/// Ordered set of ports belonging to one part
#[derive(Debug, Clone)]
pub struct PortSet {
    owner: String,
    ports: IndexMap<String, Port>,
}

impl PortSet {
    pub fn new(owner: &str, specs: Vec<PortSpec>) -> Result<Self> {
        let mut set = Self::empty(owner);
        for spec in specs {
            set.add(spec)?;
        }
        Ok(set)
    }

    pub fn empty(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            ports: IndexMap::new(),
        }
    }

    pub fn add(&mut self, spec: PortSpec) -> Result<()> {
        if self.ports.contains_key(&spec.name) {
            return Err(SimError::DuplicateName {
                part: self.owner.clone(),
                kind: "port",
                name: spec.name,
            });
        }
        self.ports.insert(spec.name.clone(), Port::new(spec));
        Ok(())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn by_direction(&self, direction: Direction) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(move |p| p.direction() == direction)
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.ports
            .get_index_of(name)
            .ok_or_else(|| self.unknown(name))
    }

    pub fn get(&self, name: &str) -> Result<&Port> {
        self.ports.get(name).ok_or_else(|| self.unknown(name))
    }

    pub fn at(&self, index: usize) -> Option<&Port> {
        self.ports.get_index(index).map(|(_, p)| p)
    }

    fn unknown(&self, name: &str) -> SimError {
        SimError::UnknownPort {
            part: self.owner.clone(),
            port: name.to_string(),
        }
    }

    /// Write from the owning part's behavior. Only outputs may be driven this way.
    pub fn write(&mut self, name: &str, value: Value) -> Result<()> {
        let owner = self.owner.clone();
        let port = self
            .ports
            .get_mut(name)
            .ok_or_else(|| SimError::UnknownPort {
                part: owner.clone(),
                port: name.to_string(),
            })?;
        if port.direction() != Direction::Output {
            return Err(SimError::InvalidConnection(format!(
                "behavior of '{}' cannot drive its input port '{}'",
                owner, name
            )));
        }
        port.check_type(&value)?;
        port.store(value);
        Ok(())
    }

    /// Deliver a value to a slave port, by propagation or injection.
    /// A second delivery in one tick fails unless the port allows overwrites,
    /// leaving the first value intact.
    pub fn receive(&mut self, index: usize, value: Value) -> Result<()> {
        let owner = &self.owner;
        let (name, port) = self
            .ports
            .get_index_mut(index)
            .ok_or_else(|| SimError::UnknownPort {
                part: owner.clone(),
                port: format!("#{}", index),
            })?;
        port.check_type(&value)?;
        if port.updated && port.spec.overwrite == OverwritePolicy::Reject {
            return Err(SimError::Overwrite {
                part: owner.clone(),
                port: name.clone(),
            });
        }
        port.store(value);
        Ok(())
    }

    /// Take the values of all dirty ports in one direction, clearing their dirty flags
    pub(crate) fn take_dirty(&mut self, direction: Direction) -> Vec<(usize, Value)> {
        let mut taken = Vec::new();
        for (index, (_, port)) in self.ports.iter_mut().enumerate() {
            if port.direction() == direction && port.dirty {
                port.dirty = false;
                if let Some(value) = port.current {
                    taken.push((index, value));
                }
            }
        }
        taken
    }

    pub fn any_input_updated(&self) -> bool {
        self.by_direction(Direction::Input).any(|p| p.updated)
    }

    pub fn reset(&mut self) {
        self.ports.values_mut().for_each(Port::reset);
    }

    pub(crate) fn begin_tick(&mut self) {
        self.ports.values_mut().for_each(Port::begin_tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::values::Logic;

    fn register_ports() -> PortSet {
        PortSet::new(
            "dut",
            vec![
                PortSpec::input("clk"),
                PortSpec::input("in_0"),
                PortSpec::output("out_0"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_write_sets_value_and_flag() {
        let mut ports = register_ports();
        ports.write("out_0", Value::Logic(Logic::One)).unwrap();
        let port = ports.get("out_0").unwrap();
        assert_eq!(port.peek(), Some(&Value::Logic(Logic::One)));
        assert_eq!(port.previous(), Some(&Value::Logic(Logic::U)));
        assert!(port.is_updated());
    }

    #[test]
    fn test_peek_does_not_clear_updated() {
        let mut ports = register_ports();
        let clk = ports.index_of("clk").unwrap();
        ports.receive(clk, Value::Logic(Logic::One)).unwrap();
        let port = ports.get("clk").unwrap();
        let _ = port.peek();
        let _ = port.peek();
        assert!(port.is_updated(), "Peeking must not consume the update flag");
        ports.begin_tick();
        assert!(!ports.get("clk").unwrap().is_updated(), "Tick start clears the flag");
    }

    #[test]
    fn test_second_receive_is_overwrite_error() {
        let mut ports = register_ports();
        let in_0 = ports.index_of("in_0").unwrap();
        ports.receive(in_0, Value::Logic(Logic::One)).unwrap();
        let result = ports.receive(in_0, Value::Logic(Logic::Zero));
        assert!(matches!(result, Err(SimError::Overwrite { .. })));
        assert_eq!(
            ports.get("in_0").unwrap().peek(),
            Some(&Value::Logic(Logic::One)),
            "First written value must stay intact"
        );
    }

    #[test]
    fn test_overwrite_allowed_by_policy() {
        let mut ports = PortSet::new("p", vec![PortSpec::input("a").allow_overwrite()]).unwrap();
        ports.receive(0, Value::Logic(Logic::One)).unwrap();
        ports.receive(0, Value::Logic(Logic::Zero)).unwrap();
        assert_eq!(ports.get("a").unwrap().peek(), Some(&Value::Logic(Logic::Zero)));
    }

    #[test]
    fn test_behavior_cannot_write_input() {
        let mut ports = register_ports();
        let result = ports.write("clk", Value::Logic(Logic::One));
        assert!(result.is_err(), "Inputs are driven only by propagation");
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut ports = register_ports();
        let result = ports.write("out_0", Value::Float(1.0));
        assert!(matches!(result, Err(SimError::TypeMismatch { .. })));
    }

    #[test]
    fn test_pulse_port_cleared_at_tick_start() {
        let mut ports = PortSet::new("p", vec![PortSpec::output("strobe").pulse()]).unwrap();
        ports.write("strobe", Value::Logic(Logic::One)).unwrap();
        ports.begin_tick();
        assert_eq!(ports.get("strobe").unwrap().peek(), None);
    }

    #[test]
    fn test_duplicate_port_names_rejected() {
        let result = PortSet::new("p", vec![PortSpec::input("a"), PortSpec::output("a")]);
        assert!(matches!(result, Err(SimError::DuplicateName { .. })));
    }

    #[test]
    fn test_take_dirty_clears_flags() {
        let mut ports = register_ports();
        ports.write("out_0", Value::Logic(Logic::Zero)).unwrap();
        let taken = ports.take_dirty(Direction::Output);
        assert_eq!(taken, vec![(2, Value::Logic(Logic::Zero))]);
        assert!(ports.take_dirty(Direction::Output).is_empty());
        assert!(ports.get("out_0").unwrap().is_updated(), "Updated survives propagation");
    }
}
