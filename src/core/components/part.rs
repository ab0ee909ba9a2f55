use crate::core::components::behavior::{Behavior, BehaviorContext};
use crate::core::components::condition::{ConditionView, SchedulingCondition};
use crate::core::components::ports::PortSet;
use crate::core::connections::ConnectionManager;
use crate::core::error::{Result, SimError};
use crate::core::event_queue::{EventQueue, Wakeup};
use crate::core::execution::config::ConcurrencyMode;
use crate::core::execution::execution_order::ExecutionOrderBuilder;
use crate::core::execution::scheduler;
use crate::core::trace::TraceSink;
use log::trace;
use std::sync::Arc;

/// Per-tick state handed down the part tree
pub struct TickContext<'a> {
    pub tick: u64,
    pub max_passes: usize,
    pub tracer: &'a dyn TraceSink,
}

/// Leaf payload: a behavior and the condition deciding when it runs
pub struct Leaf {
    pub(crate) behavior: Box<dyn Behavior>,
    pub(crate) condition: SchedulingCondition,
}

/// Structural payload: children, their wiring and the strategy resolving them
pub struct Structure {
    pub(crate) children: Vec<Part>,
    pub(crate) wiring: ConnectionManager,
    pub(crate) strategy: ConcurrencyMode,
    /// Dependency stages, computed at init for the Rayon strategy
    pub(crate) stages: Vec<Vec<usize>>,
}

impl Structure {
    pub(crate) fn build_stages(&mut self) -> Result<()> {
        let names: Vec<&str> = self.children.iter().map(|c| c.id()).collect();
        self.stages = ExecutionOrderBuilder::build_stages(
            self.children.len(),
            &self.wiring.child_edges(),
            &names,
        )?;
        Ok(())
    }
}

pub enum PartKind {
    Leaf(Leaf),
    Structural(Structure),
}

/// Node of the containment tree
pub struct Part {
    pub(crate) id: String,
    pub(crate) class: String,
    pub(crate) ports: PortSet,
    pub(crate) queues: Vec<EventQueue>,
    pub(crate) kind: PartKind,
}

impl Part {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    pub fn queues(&self) -> &[EventQueue] {
        &self.queues
    }

    pub fn queue(&self, name: &str) -> Result<&EventQueue> {
        self.queues
            .iter()
            .find(|q| q.name() == name)
            .ok_or_else(|| SimError::UnknownQueue {
                part: self.id.clone(),
                queue: name.to_string(),
            })
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.kind, PartKind::Structural(_))
    }

    /// Direct children; empty for a leaf
    pub fn children(&self) -> &[Part] {
        match &self.kind {
            PartKind::Structural(s) => &s.children,
            PartKind::Leaf(_) => &[],
        }
    }

    pub fn child(&self, id: &str) -> Option<&Part> {
        self.children().iter().find(|c| c.id == id)
    }

    pub(crate) fn child_mut(&mut self, id: &str) -> Option<&mut Part> {
        match &mut self.kind {
            PartKind::Structural(s) => s.children.iter_mut().find(|c| c.id == id),
            PartKind::Leaf(_) => None,
        }
    }

    pub fn wiring(&self) -> Option<&ConnectionManager> {
        match &self.kind {
            PartKind::Structural(s) => Some(&s.wiring),
            PartKind::Leaf(_) => None,
        }
    }

    pub fn strategy(&self) -> Option<ConcurrencyMode> {
        match &self.kind {
            PartKind::Structural(s) => Some(s.strategy),
            PartKind::Leaf(_) => None,
        }
    }

    pub fn condition(&self) -> Option<&SchedulingCondition> {
        match &self.kind {
            PartKind::Leaf(leaf) => Some(&leaf.condition),
            PartKind::Structural(_) => None,
        }
    }

    /// Behavior description lines of a leaf
    pub fn describe(&self) -> Vec<String> {
        match &self.kind {
            PartKind::Leaf(leaf) => leaf.behavior.describe(),
            PartKind::Structural(_) => Vec::new(),
        }
    }

    /// Reset ports to their initial values and initialise the subtree
    pub fn init(&mut self) -> Result<()> {
        self.ports.reset();
        match &mut self.kind {
            PartKind::Leaf(leaf) => leaf.behavior.init(),
            PartKind::Structural(s) => {
                for child in &mut s.children {
                    child.init()?;
                }
                if s.strategy == ConcurrencyMode::Rayon {
                    s.build_stages()?;
                }
                Ok(())
            }
        }
    }

    /// Terminate the whole subtree. Every child is terminated even when an
    /// earlier one fails; the first error is returned.
    pub fn term(&mut self) -> Result<()> {
        match &mut self.kind {
            PartKind::Leaf(leaf) => leaf.behavior.term(),
            PartKind::Structural(s) => {
                let mut first_error = None;
                for child in &mut s.children {
                    if let Err(e) = child.term() {
                        log::error!("Failed to terminate part '{}': {}", child.id, e);
                        first_error.get_or_insert(e);
                    }
                }
                first_error.map_or(Ok(()), Err)
            }
        }
    }

    pub(crate) fn begin_tick(&mut self) {
        self.ports.begin_tick();
        if let PartKind::Structural(s) = &mut self.kind {
            s.children.iter_mut().for_each(Part::begin_tick);
        }
    }

    /// Whether the part has anything to do in the current tick
    pub fn is_eligible(&self) -> bool {
        match &self.kind {
            PartKind::Leaf(leaf) => leaf
                .condition
                .is_satisfied(&ConditionView::new(&self.ports, &self.queues)),
            PartKind::Structural(s) => {
                self.ports.any_input_updated()
                    || self.queues.iter().any(|q| !q.is_empty())
                    || s.children.iter().any(Part::is_eligible)
            }
        }
    }

    /// Any queue in the subtree holding an event
    pub fn has_queued_events(&self) -> bool {
        self.queues.iter().any(|q| !q.is_empty())
            || self.children().iter().any(Part::has_queued_events)
    }

    pub(crate) fn run(&mut self, ctx: &TickContext<'_>) -> Result<()> {
        match &mut self.kind {
            PartKind::Leaf(leaf) => {
                trace!("[{}] running behavior of '{}'", ctx.tick, self.id);
                let mut behavior_ctx =
                    BehaviorContext::new(&self.id, ctx.tick, &mut self.ports, &self.queues, ctx.tracer);
                leaf.behavior.behavior(&mut behavior_ctx)
            }
            PartKind::Structural(s) => scheduler::resolve(&self.id, &mut self.ports, s, ctx),
        }
    }

    pub(crate) fn install_wakeup(&self, wakeup: &Arc<Wakeup>) {
        for queue in &self.queues {
            queue.set_wakeup(Arc::clone(wakeup));
        }
        self.children().iter().for_each(|c| c.install_wakeup(wakeup));
    }

    pub(crate) fn set_strategy_recursive(&mut self, mode: ConcurrencyMode) {
        if let PartKind::Structural(s) = &mut self.kind {
            s.strategy = mode;
            s.children
                .iter_mut()
                .for_each(|c| c.set_strategy_recursive(mode));
        }
    }

    /// Point queue `name` at `source`'s storage, following event wires down
    /// so that every queue bound to it sees the same contents
    pub(crate) fn alias_queue(&mut self, name: &str, source: &EventQueue) -> Result<()> {
        let queue = self
            .queues
            .iter_mut()
            .find(|q| q.name() == name)
            .ok_or_else(|| SimError::UnknownQueue {
                part: self.id.clone(),
                queue: name.to_string(),
            })?;
        queue.alias(source);
        if let PartKind::Structural(s) = &mut self.kind {
            let bound: Vec<(usize, String)> = s
                .wiring
                .event_wires()
                .iter()
                .filter(|w| w.queue == name)
                .map(|w| (w.child, w.child_queue.clone()))
                .collect();
            for (child, child_queue) in bound {
                s.children[child].alias_queue(&child_queue, source)?;
            }
        }
        Ok(())
    }

    /// Debug rendering of the subtree, one line per part
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(0, &mut out);
        out
    }

    fn write_tree(&self, depth: usize, out: &mut String) {
        out.push_str(&format!("{}{} ({})\n", "  ".repeat(depth), self.id, self.class));
        for child in self.children() {
            child.write_tree(depth + 1, out);
        }
    }
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("ports", &self.ports.len())
            .field("queues", &self.queues.len())
            .field("children", &self.children().len())
            .finish()
    }
}
