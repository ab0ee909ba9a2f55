//! Tree-walk resolution of dotted paths such as `dut.out_0`.
//!
//! Paths are relative to a root part. All but the last segment name nested
//! parts; the last segment names a port or queue of the part reached.

use crate::core::components::part::Part;
use crate::core::components::ports::Port;
use crate::core::error::{Result, SimError};
use crate::core::event_queue::EventQueue;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortPath {
    parts: Vec<String>,
    leaf: String,
}

impl PortPath {
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments: Vec<String> = Vec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(SimError::Resolution {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        let leaf = segments.pop().ok_or_else(|| SimError::Resolution {
            path: path.to_string(),
            segment: String::new(),
        })?;
        Ok(Self {
            parts: segments,
            leaf,
        })
    }

    /// Nested part identifiers, outermost first
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Final segment: the port or queue name
    pub fn leaf(&self) -> &str {
        &self.leaf
    }
}

impl fmt::Display for PortPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "{}.", part)?;
        }
        write!(f, "{}", self.leaf)
    }
}

fn missing(path: &[String], segment: &str) -> SimError {
    SimError::Resolution {
        path: path.join("."),
        segment: segment.to_string(),
    }
}

pub fn resolve_part<'a>(root: &'a Part, path: &[String]) -> Result<&'a Part> {
    let mut current = root;
    for segment in path {
        current = current
            .child(segment)
            .ok_or_else(|| missing(path, segment))?;
    }
    Ok(current)
}

pub fn resolve_part_mut<'a>(root: &'a mut Part, path: &[String]) -> Result<&'a mut Part> {
    let mut current = root;
    for segment in path {
        current = current
            .child_mut(segment)
            .ok_or_else(|| missing(path, segment))?;
    }
    Ok(current)
}

pub fn resolve_port<'a>(root: &'a Part, path: &PortPath) -> Result<&'a Port> {
    let part = resolve_part(root, path.parts())?;
    part.ports().get(path.leaf()).map_err(|_| SimError::Resolution {
        path: path.to_string(),
        segment: path.leaf().to_string(),
    })
}

pub fn resolve_queue<'a>(root: &'a Part, path: &PortPath) -> Result<&'a EventQueue> {
    let part = resolve_part(root, path.parts())?;
    part.queue(path.leaf()).map_err(|_| SimError::Resolution {
        path: path.to_string(),
        segment: path.leaf().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_parts_and_leaf() {
        let path = PortPath::parse("tb.dut.out_0").unwrap();
        assert_eq!(path.parts(), &["tb".to_string(), "dut".to_string()]);
        assert_eq!(path.leaf(), "out_0");
        assert_eq!(path.to_string(), "tb.dut.out_0");
    }

    #[test]
    fn test_parse_single_segment() {
        let path = PortPath::parse("clk").unwrap();
        assert!(path.parts().is_empty());
        assert_eq!(path.leaf(), "clk");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(matches!(PortPath::parse(""), Err(SimError::Resolution { .. })));
        assert!(matches!(PortPath::parse("dut..clk"), Err(SimError::Resolution { .. })));
        assert!(matches!(PortPath::parse("dut."), Err(SimError::Resolution { .. })));
    }
}
