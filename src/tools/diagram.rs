//! JSON exchange format for the topology of a structural part.
//!
//! A document carries the part's own ports, its inner parts with their
//! ports, and the wires between them. Importing a document drives a
//! `DiagramCanvas`, which is how a block-diagram editor is populated.

use crate::core::components::part::Part;
use crate::core::components::port_specs::Direction;
use crate::core::components::ports::PortSet;
use crate::core::connections::Endpoint;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("Only structural parts can be exported, '{0}' is a leaf")]
    NotStructural(String),

    #[error("Diagram document has no root 'part' object")]
    MissingPart,

    #[error("Diagram JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

impl From<Direction> for PinDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Input => PinDirection::Input,
            Direction::Output => PinDirection::Output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    pub name: String,
    pub direction: PinDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerPart {
    pub identifier: String,
    pub class: String,
    #[serde(default)]
    pub ports: Vec<PortEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub part_id: String,
    pub port_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: PortRef,
    pub destination: PortRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramPart {
    pub identifier: String,
    pub class: String,
    #[serde(default)]
    pub ports: Vec<PortEntry>,
    #[serde(default)]
    pub inner_parts: Vec<InnerPart>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramDocument {
    pub format_version: String,
    pub part: DiagramPart,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    format_version: Option<String>,
    #[serde(default)]
    part: Option<DiagramPart>,
}

impl DiagramDocument {
    pub fn to_json(&self) -> Result<String, DiagramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DiagramError> {
        let raw: RawDocument = serde_json::from_str(text)?;
        let part = raw.part.ok_or(DiagramError::MissingPart)?;
        let format_version = raw.format_version.unwrap_or_else(|| FORMAT_VERSION.to_string());
        if format_version != FORMAT_VERSION {
            warn!("Diagram format version '{}' differs from '{}'", format_version, FORMAT_VERSION);
        }
        Ok(Self { format_version, part })
    }
}

fn port_entries(ports: &PortSet) -> Vec<PortEntry> {
    ports
        .by_direction(Direction::Input)
        .chain(ports.by_direction(Direction::Output))
        .map(|p| PortEntry {
            name: p.name().to_string(),
            direction: p.direction().into(),
        })
        .collect()
}

fn port_ref(part: &Part, endpoint: Endpoint) -> Option<PortRef> {
    let (owner, index) = match endpoint {
        Endpoint::Own { port } => (part, port),
        Endpoint::Child { part: child, port } => (part.children().get(child)?, port),
    };
    Some(PortRef {
        part_id: owner.id().to_string(),
        port_id: owner.ports().at(index)?.name().to_string(),
    })
}

/// Capture the topology of a structural part
pub fn export_part(part: &Part) -> Result<DiagramDocument, DiagramError> {
    let wiring = part
        .wiring()
        .ok_or_else(|| DiagramError::NotStructural(part.id().to_string()))?;

    let inner_parts = part
        .children()
        .iter()
        .map(|child| InnerPart {
            identifier: child.id().to_string(),
            class: child.class().to_string(),
            ports: port_entries(child.ports()),
        })
        .collect();

    let connections = wiring
        .wires()
        .iter()
        .filter_map(|wire| {
            Some(Connection {
                source: port_ref(part, wire.source)?,
                destination: port_ref(part, wire.destination)?,
            })
        })
        .collect();

    Ok(DiagramDocument {
        format_version: FORMAT_VERSION.to_string(),
        part: DiagramPart {
            identifier: part.id().to_string(),
            class: part.class().to_string(),
            ports: port_entries(part.ports()),
            inner_parts,
            connections,
        },
    })
}

/// Handle of a pin created on a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinId(pub usize);

/// Pins of a block, by port name
#[derive(Debug, Clone, Default)]
pub struct BlockPins {
    pub inputs: HashMap<String, PinId>,
    pub outputs: HashMap<String, PinId>,
}

/// Drawing surface a document is imported into. Creation methods may
/// return `None` when the canvas refuses an item.
pub trait DiagramCanvas {
    fn create_input_pin(&mut self, name: &str) -> Option<PinId>;
    fn create_output_pin(&mut self, name: &str) -> Option<PinId>;
    fn create_block(&mut self, name: &str, inputs: &[String], outputs: &[String]) -> Option<BlockPins>;
    fn create_wire(&mut self, source: PinId, destination: PinId);
}

/// Summary of what an import created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub pins: usize,
    pub blocks: usize,
    pub wires: usize,
    pub skipped_wires: usize,
}

pub fn block_name(identifier: &str, class: &str) -> String {
    format!("{} ({})", identifier, class)
}

/// Build the diagram described by `document` on `canvas`
pub fn import_document(document: &DiagramDocument, canvas: &mut dyn DiagramCanvas) -> ImportReport {
    let part = &document.part;
    let mut report = ImportReport::default();
    let mut input_pins: HashMap<&str, PinId> = HashMap::new();
    let mut output_pins: HashMap<&str, PinId> = HashMap::new();
    let mut blocks: HashMap<&str, BlockPins> = HashMap::new();

    for port in &part.ports {
        let (pin, table) = match port.direction {
            PinDirection::Input => (canvas.create_input_pin(&port.name), &mut input_pins),
            PinDirection::Output => (canvas.create_output_pin(&port.name), &mut output_pins),
        };
        if let Some(pin) = pin {
            table.insert(port.name.as_str(), pin);
            report.pins += 1;
        }
    }

    for inner in &part.inner_parts {
        let names = |direction: PinDirection| -> Vec<String> {
            inner
                .ports
                .iter()
                .filter(|p| p.direction == direction)
                .map(|p| p.name.clone())
                .collect()
        };
        let name = block_name(&inner.identifier, &inner.class);
        if let Some(pins) = canvas.create_block(&name, &names(PinDirection::Input), &names(PinDirection::Output)) {
            blocks.insert(inner.identifier.as_str(), pins);
            report.blocks += 1;
        }
    }

    for connection in &part.connections {
        let source = if connection.source.part_id == part.identifier {
            input_pins.get(connection.source.port_id.as_str()).copied()
        } else {
            blocks
                .get(connection.source.part_id.as_str())
                .and_then(|b| b.outputs.get(&connection.source.port_id).copied())
        };
        let destination = if connection.destination.part_id == part.identifier {
            output_pins.get(connection.destination.port_id.as_str()).copied()
        } else {
            blocks
                .get(connection.destination.part_id.as_str())
                .and_then(|b| b.inputs.get(&connection.destination.port_id).copied())
        };
        match (source, destination) {
            (Some(source), Some(destination)) => {
                canvas.create_wire(source, destination);
                report.wires += 1;
            }
            _ => {
                debug!(
                    "Skipping wire {}.{} -> {}.{}: endpoint not on canvas",
                    connection.source.part_id,
                    connection.source.port_id,
                    connection.destination.part_id,
                    connection.destination.port_id
                );
                report.skipped_wires += 1;
            }
        }
    }

    report
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOwner {
    DiagramInput,
    DiagramOutput,
    Block(usize),
}

#[derive(Debug, Clone)]
pub struct Pin {
    pub owner: PinOwner,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// In-memory canvas
#[derive(Debug, Clone, Default)]
pub struct BlockDiagram {
    pins: Vec<Pin>,
    blocks: Vec<Block>,
    wires: Vec<(PinId, PinId)>,
}

impl BlockDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn wires(&self) -> &[(PinId, PinId)] {
        &self.wires
    }

    /// Readable name of a pin: the bare name for diagram pins,
    /// `"<block>.<pin>"` for block pins
    pub fn pin_label(&self, pin: PinId) -> Option<String> {
        let pin = self.pins.get(pin.0)?;
        Some(match pin.owner {
            PinOwner::DiagramInput | PinOwner::DiagramOutput => pin.name.clone(),
            PinOwner::Block(block) => format!("{}.{}", self.blocks.get(block)?.name, pin.name),
        })
    }

    pub fn wire_labels(&self) -> Vec<(String, String)> {
        self.wires
            .iter()
            .filter_map(|(s, d)| Some((self.pin_label(*s)?, self.pin_label(*d)?)))
            .collect()
    }

    fn add_pin(&mut self, owner: PinOwner, name: &str) -> PinId {
        self.pins.push(Pin {
            owner,
            name: name.to_string(),
        });
        PinId(self.pins.len() - 1)
    }
}

impl DiagramCanvas for BlockDiagram {
    fn create_input_pin(&mut self, name: &str) -> Option<PinId> {
        Some(self.add_pin(PinOwner::DiagramInput, name))
    }

    fn create_output_pin(&mut self, name: &str) -> Option<PinId> {
        Some(self.add_pin(PinOwner::DiagramOutput, name))
    }

    fn create_block(&mut self, name: &str, inputs: &[String], outputs: &[String]) -> Option<BlockPins> {
        let index = self.blocks.len();
        self.blocks.push(Block {
            name: name.to_string(),
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        });
        let mut pins = BlockPins::default();
        for input in inputs {
            let id = self.add_pin(PinOwner::Block(index), input);
            pins.inputs.insert(input.clone(), id);
        }
        for output in outputs {
            let id = self.add_pin(PinOwner::Block(index), output);
            pins.outputs.insert(output.clone(), id);
        }
        Some(pins)
    }

    fn create_wire(&mut self, source: PinId, destination: PinId) {
        self.wires.push((source, destination));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::{behavior_fn, LeafBuilder, PortSpec, StructureBuilder};

    fn pipeline_top() -> Part {
        let leaf = |id: &str| {
            LeafBuilder::new(id, "Gate")
                .port(PortSpec::input("in"))
                .port(PortSpec::output("out"))
                .build(behavior_fn(|_| Ok(())))
                .unwrap()
        };
        StructureBuilder::new("top", "Pipeline")
            .port(PortSpec::input("stim"))
            .unwrap()
            .port(PortSpec::output("result"))
            .unwrap()
            .add_part(leaf("a"))
            .unwrap()
            .add_part(leaf("b"))
            .unwrap()
            .wire("stim", "a.in")
            .unwrap()
            .wire("a.out", "b.in")
            .unwrap()
            .wire("b.out", "result")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_export_uses_top_identifier_for_own_ports() {
        let document = export_part(&pipeline_top()).unwrap();
        assert_eq!(document.format_version, "1.0");
        assert_eq!(document.part.inner_parts.len(), 2);
        let first = &document.part.connections[0];
        assert_eq!(first.source, PortRef { part_id: "top".into(), port_id: "stim".into() });
        assert_eq!(first.destination, PortRef { part_id: "a".into(), port_id: "in".into() });
    }

    #[test]
    fn test_json_field_names() {
        let json = export_part(&pipeline_top()).unwrap().to_json().unwrap();
        for key in ["\"format_version\"", "\"inner_parts\"", "\"part_id\"", "\"port_id\"", "\"direction\": \"input\""] {
            assert!(json.contains(key), "Missing {} in:\n{}", key, json);
        }
        let parsed = DiagramDocument::from_json(&json).unwrap();
        assert_eq!(parsed, export_part(&pipeline_top()).unwrap());
    }

    #[test]
    fn test_export_rejects_leaf() {
        let leaf = LeafBuilder::new("solo", "Gate").build(behavior_fn(|_| Ok(()))).unwrap();
        assert!(matches!(export_part(&leaf), Err(DiagramError::NotStructural(ref id)) if id == "solo"));
    }

    #[test]
    fn test_missing_part_is_an_error() {
        assert!(matches!(
            DiagramDocument::from_json(r#"{"format_version": "1.0"}"#),
            Err(DiagramError::MissingPart)
        ));
        assert!(matches!(DiagramDocument::from_json("not json"), Err(DiagramError::Json(_))));
    }

    #[test]
    fn test_import_builds_pins_blocks_and_wires() {
        let document = export_part(&pipeline_top()).unwrap();
        let mut canvas = BlockDiagram::new();
        let report = import_document(&document, &mut canvas);

        assert_eq!(report, ImportReport { pins: 2, blocks: 2, wires: 3, skipped_wires: 0 });
        let names: Vec<&str> = canvas.blocks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["a (Gate)", "b (Gate)"]);
        assert_eq!(
            canvas.wire_labels(),
            vec![
                ("stim".to_string(), "a (Gate).in".to_string()),
                ("a (Gate).out".to_string(), "b (Gate).in".to_string()),
                ("b (Gate).out".to_string(), "result".to_string()),
            ]
        );
    }

    #[test]
    fn test_import_skips_unresolved_endpoints() {
        let mut document = export_part(&pipeline_top()).unwrap();
        document.part.connections.push(Connection {
            source: PortRef { part_id: "ghost".into(), port_id: "out".into() },
            destination: PortRef { part_id: "b".into(), port_id: "in".into() },
        });
        let mut canvas = BlockDiagram::new();
        let report = import_document(&document, &mut canvas);
        assert_eq!(report.wires, 3);
        assert_eq!(report.skipped_wires, 1);
    }
}
