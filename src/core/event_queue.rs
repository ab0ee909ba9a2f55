//! Bounded FIFO queues carrying external stimuli into the simulation.
//!
//! A queue handle is cheap to clone; clones share the same contents, which is
//! how an external producer thread and the consuming part see one queue.

use crate::core::error::{Result, SimError};
use crate::core::values::{Value, ValueType};
use log::warn;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Behaviour of `push` on a full queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail with `QueueFull`
    #[default]
    Reject,
    /// Keep the queued items, discard the incoming one
    DropNewest,
    /// Discard the oldest queued item to make room
    DropOldest,
    /// Wait until the consumer makes room
    Block,
}

/// Outcome of a successful push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    DroppedNewest,
    DroppedOldest,
    /// A `Block` push gave up at its deadline; the value was not queued
    TimedOut,
}

/// Wake-up signal shared between queues and an idle run loop
#[derive(Debug, Default)]
pub struct Wakeup {
    pending: Mutex<bool>,
    signal: Condvar,
}

impl Wakeup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        *self.pending.lock() = true;
        self.signal.notify_all();
    }

    /// Park until notified or until `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) {
        let mut pending = self.pending.lock();
        if !*pending {
            self.signal.wait_for(&mut pending, timeout);
        }
        *pending = false;
    }
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<Value>,
    wakeup: Option<Arc<Wakeup>>,
}

#[derive(Debug)]
struct Shared {
    capacity: usize,
    policy: OverflowPolicy,
    value_type: Option<ValueType>,
    state: Mutex<QueueState>,
    not_full: Condvar,
}

/// Named handle to a bounded, thread-safe FIFO
#[derive(Debug, Clone)]
pub struct EventQueue {
    name: String,
    shared: Arc<Shared>,
}

impl EventQueue {
    pub fn new(name: &str, capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        Self::build(name, capacity, policy, None)
    }

    /// Queue that only accepts payloads of `value_type`
    pub fn typed(name: &str, capacity: usize, policy: OverflowPolicy, value_type: ValueType) -> Result<Self> {
        Self::build(name, capacity, policy, Some(value_type))
    }

    fn build(name: &str, capacity: usize, policy: OverflowPolicy, value_type: Option<ValueType>) -> Result<Self> {
        if capacity == 0 {
            return Err(SimError::InvalidCapacity {
                queue: name.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            shared: Arc::new(Shared {
                capacity,
                policy,
                value_type,
                state: Mutex::new(QueueState {
                    items: VecDeque::with_capacity(capacity),
                    wakeup: None,
                }),
                not_full: Condvar::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.shared.value_type
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.shared.policy
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().items.is_empty()
    }

    /// True when both handles refer to the same underlying queue
    pub fn shares_storage_with(&self, other: &EventQueue) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<PushOutcome> {
        self.push_until(value.into(), None)
    }

    /// Like `push`, but a `Block` queue waits at most `timeout` for room and
    /// reports `TimedOut` instead of queueing
    pub fn push_timeout(&self, value: impl Into<Value>, timeout: Duration) -> Result<PushOutcome> {
        self.push_until(value.into(), Some(Instant::now() + timeout))
    }

    fn push_until(&self, value: Value, deadline: Option<Instant>) -> Result<PushOutcome> {
        if let Some(expected) = self.shared.value_type {
            if value.value_type() != expected {
                return Err(SimError::TypeMismatch {
                    port: self.name.clone(),
                    expected: expected.to_string(),
                    found: value.value_type().to_string(),
                });
            }
        }

        let mut state = self.shared.state.lock();
        let mut outcome = PushOutcome::Queued;
        if state.items.len() >= self.shared.capacity {
            match self.shared.policy {
                OverflowPolicy::Reject => {
                    return Err(SimError::QueueFull {
                        queue: self.name.clone(),
                        capacity: self.shared.capacity,
                    });
                }
                OverflowPolicy::DropNewest => {
                    warn!("Queue '{}' full, dropping incoming {}", self.name, value);
                    return Ok(PushOutcome::DroppedNewest);
                }
                OverflowPolicy::DropOldest => {
                    if let Some(dropped) = state.items.pop_front() {
                        warn!("Queue '{}' full, dropping oldest {}", self.name, dropped);
                    }
                    outcome = PushOutcome::DroppedOldest;
                }
                OverflowPolicy::Block => {
                    while state.items.len() >= self.shared.capacity {
                        match deadline {
                            Some(deadline) => {
                                let waited = self.shared.not_full.wait_until(&mut state, deadline);
                                if waited.timed_out() && state.items.len() >= self.shared.capacity {
                                    return Ok(PushOutcome::TimedOut);
                                }
                            }
                            None => self.shared.not_full.wait(&mut state),
                        }
                    }
                }
            }
        }
        state.items.push_back(value);
        if let Some(wakeup) = &state.wakeup {
            wakeup.notify();
        }
        Ok(outcome)
    }

    /// Remove and return the oldest element
    pub fn pop(&self) -> Result<Value> {
        let mut state = self.shared.state.lock();
        let value = state.items.pop_front().ok_or_else(|| SimError::EmptyQueue {
            queue: self.name.clone(),
        })?;
        self.shared.not_full.notify_one();
        Ok(value)
    }

    /// Snapshot of the queued values, oldest first
    pub fn contents(&self) -> Vec<Value> {
        self.shared.state.lock().items.iter().copied().collect()
    }

    pub fn clear(&self) {
        self.shared.state.lock().items.clear();
        self.shared.not_full.notify_all();
    }

    pub(crate) fn set_wakeup(&self, wakeup: Arc<Wakeup>) {
        self.shared.state.lock().wakeup = Some(wakeup);
    }

    /// Rebind this handle onto another queue's storage, keeping its own name
    pub(crate) fn alias(&mut self, source: &EventQueue) {
        self.shared = Arc::clone(&source.shared);
    }
}

/// External producer of stimuli, e.g. a wall-clock timer
pub trait EventSource {
    /// Attach the queue this source will push into
    fn bind(&mut self, queue: EventQueue);
}
