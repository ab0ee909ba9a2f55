//! Builders assembling leaf and structural parts.
//!
//! All name and wiring validation happens here, so a built `Part` is
//! structurally sound: ports exist, directions and types match, and no slave
//! has two masters.

use crate::core::components::behavior::Behavior;
use crate::core::components::condition::SchedulingCondition;
use crate::core::components::part::{Leaf, Part, PartKind, Structure};
use crate::core::components::port_specs::PortSpec;
use crate::core::components::ports::PortSet;
use crate::core::connections::{ConnectionManager, Endpoint, EventWire, PortValidator, Wire};
use crate::core::error::{Result, SimError};
use crate::core::event_queue::EventQueue;
use crate::core::execution::config::ConcurrencyMode;
use crate::core::resolve::PortPath;
use crate::tools::vcd::{VcdConfig, VcdMonitor, MONITOR_ID};
use log::debug;

fn check_queue_names(part: &str, queues: &[EventQueue]) -> Result<()> {
    for (i, queue) in queues.iter().enumerate() {
        if queues[..i].iter().any(|q| q.name() == queue.name()) {
            return Err(SimError::DuplicateName {
                part: part.to_string(),
                kind: "event queue",
                name: queue.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Builder for a leaf part
pub struct LeafBuilder {
    id: String,
    class: String,
    ports: Vec<PortSpec>,
    queues: Vec<EventQueue>,
    condition: SchedulingCondition,
}

impl LeafBuilder {
    pub fn new(id: &str, class: &str) -> Self {
        Self {
            id: id.to_string(),
            class: class.to_string(),
            ports: Vec::new(),
            queues: Vec::new(),
            condition: SchedulingCondition::default(),
        }
    }

    pub fn port(mut self, spec: PortSpec) -> Self {
        self.ports.push(spec);
        self
    }

    pub fn queue(mut self, queue: EventQueue) -> Self {
        self.queues.push(queue);
        self
    }

    pub fn condition(mut self, condition: SchedulingCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn build(self, behavior: Box<dyn Behavior>) -> Result<Part> {
        let ports = PortSet::new(&self.id, self.ports)?;
        check_queue_names(&self.id, &self.queues)?;
        self.condition.validate(&ports, &self.queues)?;
        Ok(Part {
            id: self.id,
            class: self.class,
            ports,
            queues: self.queues,
            kind: PartKind::Leaf(Leaf {
                behavior,
                condition: self.condition,
            }),
        })
    }
}

/// Builder for a structural part.
///
/// Children are added first; `wire` and `wire_event` then refer to them by
/// path: a single segment names one of the part's own ports, `child.port`
/// names a port of a direct child.
pub struct StructureBuilder {
    id: String,
    class: String,
    ports: PortSet,
    queues: Vec<EventQueue>,
    children: Vec<Part>,
    wiring: ConnectionManager,
    strategy: ConcurrencyMode,
    monitor: Option<VcdConfig>,
}

impl StructureBuilder {
    pub fn new(id: &str, class: &str) -> Self {
        Self {
            id: id.to_string(),
            class: class.to_string(),
            ports: PortSet::empty(id),
            queues: Vec::new(),
            children: Vec::new(),
            wiring: ConnectionManager::new(),
            strategy: ConcurrencyMode::default(),
            monitor: None,
        }
    }

    pub fn port(mut self, spec: PortSpec) -> Result<Self> {
        self.ports.add(spec)?;
        Ok(self)
    }

    pub fn queue(mut self, queue: EventQueue) -> Result<Self> {
        if self.queues.iter().any(|q| q.name() == queue.name()) {
            return Err(SimError::DuplicateName {
                part: self.id.clone(),
                kind: "event queue",
                name: queue.name().to_string(),
            });
        }
        self.queues.push(queue);
        Ok(self)
    }

    pub fn strategy(mut self, strategy: ConcurrencyMode) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn add_part(mut self, part: Part) -> Result<Self> {
        if self.children.iter().any(|c| c.id == part.id) {
            return Err(SimError::DuplicateName {
                part: self.id.clone(),
                kind: "part",
                name: part.id,
            });
        }
        self.children.push(part);
        Ok(self)
    }

    /// Add a monitor recording the configured signals. It is placed after
    /// every other child when the part is built.
    pub fn attach_vcd_monitor(mut self, config: VcdConfig) -> Self {
        self.monitor = Some(config);
        self
    }

    fn endpoint(&self, path: &str) -> Result<(Endpoint, &PortSet, String)> {
        let parsed = PortPath::parse(path)?;
        match parsed.parts() {
            [] => {
                let port = self.ports.index_of(parsed.leaf())?;
                Ok((Endpoint::Own { port }, &self.ports, parsed.leaf().to_string()))
            }
            [child] => {
                let index = self
                    .children
                    .iter()
                    .position(|c| &c.id == child)
                    .ok_or_else(|| SimError::Resolution {
                        path: path.to_string(),
                        segment: child.clone(),
                    })?;
                let ports = &self.children[index].ports;
                let port = ports.index_of(parsed.leaf())?;
                Ok((Endpoint::Child { part: index, port }, ports, parsed.leaf().to_string()))
            }
            _ => Err(SimError::InvalidConnection(format!(
                "'{}' is not a port of '{}' or of one of its direct children",
                path, self.id
            ))),
        }
    }

    /// Connect master `source` to slave `destination`
    pub fn wire(mut self, source: &str, destination: &str) -> Result<Self> {
        let (source_endpoint, source_ports, source_port) = self.endpoint(source)?;
        let (destination_endpoint, destination_ports, destination_port) = self.endpoint(destination)?;
        PortValidator::validate_source(source_endpoint, source_ports, &source_port)?;
        PortValidator::validate_destination(destination_endpoint, destination_ports, &destination_port)?;
        PortValidator::validate_types(source_ports, &source_port, destination_ports, &destination_port)?;

        self.wiring.add_wire(
            Wire {
                source: source_endpoint,
                destination: destination_endpoint,
            },
            &format!("{}.{}", self.id, destination),
        )?;
        debug!("Wired {}.{} -> {}.{}", self.id, source, self.id, destination);
        Ok(self)
    }

    /// Bind the child queue `child_path` (`child.queue`) to this part's queue `queue`
    pub fn wire_event(mut self, queue: &str, child_path: &str) -> Result<Self> {
        let own = self
            .queues
            .iter()
            .find(|q| q.name() == queue)
            .cloned()
            .ok_or_else(|| SimError::UnknownQueue {
                part: self.id.clone(),
                queue: queue.to_string(),
            })?;
        let parsed = PortPath::parse(child_path)?;
        let [child_id] = parsed.parts() else {
            return Err(SimError::InvalidConnection(format!(
                "'{}' is not a queue of a direct child of '{}'",
                child_path, self.id
            )));
        };
        let child = self
            .children
            .iter()
            .position(|c| &c.id == child_id)
            .ok_or_else(|| SimError::Resolution {
                path: child_path.to_string(),
                segment: child_id.clone(),
            })?;
        self.children[child].alias_queue(parsed.leaf(), &own)?;
        self.wiring.add_event_wire(EventWire {
            queue: queue.to_string(),
            child,
            child_queue: parsed.leaf().to_string(),
        });
        debug!("Bound event queue {}.{} -> {}", self.id, queue, child_path);
        Ok(self)
    }

    pub fn build(mut self) -> Result<Part> {
        if let Some(config) = self.monitor.take() {
            let monitor = VcdMonitor::part(MONITOR_ID, &config)?;
            let mut builder = self.add_part(monitor)?;
            builder = builder.wire(&config.time_source, &format!("{}.time", MONITOR_ID))?;
            for (name, source) in &config.signals {
                let port = VcdMonitor::port_name(name);
                builder = builder.wire(source, &format!("{}.{}", MONITOR_ID, port))?;
            }
            self = builder;
        }

        let stats = self.wiring.stats();
        debug!(
            "Built '{}': {} child(ren), {} wire(s) from {} master(s), {} event binding(s)",
            self.id,
            self.children.len(),
            stats.wires,
            stats.masters,
            stats.event_wires
        );
        Ok(Part {
            id: self.id,
            class: self.class,
            ports: self.ports,
            queues: self.queues,
            kind: PartKind::Structural(Structure {
                children: self.children,
                wiring: self.wiring,
                strategy: self.strategy,
                stages: Vec::new(),
            }),
        })
    }
}
