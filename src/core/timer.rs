//! Wall-clock stimulus source.

use crate::core::event_queue::{EventQueue, EventSource, PushOutcome};
use crate::core::values::Value;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest a push into a full `Block` queue waits before re-checking `stop`
const STOP_POLL: Duration = Duration::from_millis(10);

/// Pushes the elapsed time in seconds into its bound queue every `interval`
/// until `duration` has passed or `stop` is called. Runs on its own thread.
pub struct Timer {
    name: String,
    interval: Duration,
    duration: Duration,
    queue: Option<EventQueue>,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new(name: &str, interval: Duration, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            interval,
            duration,
            queue: None,
            stop: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the timer thread. Does nothing if no queue is bound or the
    /// timer is already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let Some(queue) = self.queue.clone() else {
            warn!("Timer '{}' started without a bound queue", self.name);
            self.finished.store(true, Ordering::SeqCst);
            return;
        };
        let name = self.name.clone();
        let interval = self.interval;
        let duration = self.duration;
        let stop = Arc::clone(&self.stop);
        let finished = Arc::clone(&self.finished);
        self.finished.store(false, Ordering::SeqCst);

        self.handle = Some(thread::spawn(move || {
            let start = Instant::now();
            let mut next = interval;
            while !stop.load(Ordering::SeqCst) {
                let now = start.elapsed();
                if next > now {
                    thread::sleep(next - now);
                }
                let elapsed = start.elapsed();
                if elapsed > duration || stop.load(Ordering::SeqCst) {
                    break;
                }
                push_event(&name, &queue, Value::Float(elapsed.as_secs_f64()), &stop);
                next += interval;
            }
            debug!("Timer '{}' finished", name);
            finished.store(true, Ordering::SeqCst);
        }));
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// True once the timer thread has exited
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Timer '{}' thread panicked", self.name);
            }
        }
    }
}

/// Push one event, giving up on a full `Block` queue once `stop` is set
fn push_event(name: &str, queue: &EventQueue, value: Value, stop: &AtomicBool) {
    loop {
        match queue.push_timeout(value, STOP_POLL) {
            Ok(PushOutcome::TimedOut) if !stop.load(Ordering::SeqCst) => continue,
            Ok(PushOutcome::TimedOut) => {
                debug!("Timer '{}' stopped while waiting for room in '{}'", name, queue.name());
                return;
            }
            Ok(_) => return,
            Err(e) => {
                warn!("Timer '{}' could not push event: {}", name, e);
                return;
            }
        }
    }
}

impl EventSource for Timer {
    fn bind(&mut self, queue: EventQueue) {
        self.queue = Some(queue);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}
