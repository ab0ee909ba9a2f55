use crate::core::error::{Result, SimError};
use std::collections::HashMap;

/// One end of a wire inside a structural part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Port of the structural part itself
    Own { port: usize },
    /// Port of a direct child, by declaration index
    Child { part: usize, port: usize },
}

impl Endpoint {
    pub fn child_index(&self) -> Option<usize> {
        match self {
            Endpoint::Own { .. } => None,
            Endpoint::Child { part, .. } => Some(*part),
        }
    }
}

/// Directed master → slave connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    pub source: Endpoint,
    pub destination: Endpoint,
}

/// Binding of a child's event queue onto one of the parent's queues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWire {
    pub queue: String,
    pub child: usize,
    pub child_queue: String,
}

/// Wiring table of a structural part
///
/// Fan-out from one master to many slaves is allowed; each slave has at
/// most one master.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    /// Wires in declaration order
    wires: Vec<Wire>,
    /// destination -> wire index
    drivers: HashMap<Endpoint, usize>,
    /// source -> wire indices
    fanout: HashMap<Endpoint, Vec<usize>>,
    event_wires: Vec<EventWire>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a wire; `label` names the destination in error messages
    pub fn add_wire(&mut self, wire: Wire, label: &str) -> Result<()> {
        if self.drivers.contains_key(&wire.destination) {
            return Err(SimError::MultipleDrivers {
                port: label.to_string(),
            });
        }
        let index = self.wires.len();
        self.wires.push(wire);
        self.drivers.insert(wire.destination, index);
        self.fanout.entry(wire.source).or_default().push(index);
        Ok(())
    }

    pub fn add_event_wire(&mut self, event_wire: EventWire) {
        self.event_wires.push(event_wire);
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn event_wires(&self) -> &[EventWire] {
        &self.event_wires
    }

    pub fn driver_of(&self, destination: Endpoint) -> Option<&Wire> {
        self.drivers.get(&destination).map(|&i| &self.wires[i])
    }

    /// Slaves driven by `source`, in declaration order
    pub fn targets_of(&self, source: Endpoint) -> impl Iterator<Item = Endpoint> + '_ {
        self.fanout
            .get(&source)
            .into_iter()
            .flatten()
            .map(move |&i| self.wires[i].destination)
    }

    /// Child-to-child dependency edges, deduplicated
    pub fn child_edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .wires
            .iter()
            .filter_map(|w| Some((w.source.child_index()?, w.destination.child_index()?)))
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            wires: self.wires.len(),
            masters: self.fanout.len(),
            event_wires: self.event_wires.len(),
        }
    }
}

/// Connection statistics for debugging
#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionStats {
    pub wires: usize,
    pub masters: usize,
    pub event_wires: usize,
}
