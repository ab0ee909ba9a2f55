mod scheduler_tests;

use crate::core::components::{behavior_fn, LeafBuilder, Part, PortSpec};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Leaf copying `in` to `out`, counting its invocations
pub(crate) fn pass_through(id: &str, calls: &Arc<AtomicUsize>) -> Part {
    let calls = Arc::clone(calls);
    LeafBuilder::new(id, "PassThrough")
        .port(PortSpec::input("in"))
        .port(PortSpec::output("out"))
        .build(behavior_fn(move |ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = ctx.read_logic("in")?;
            ctx.write("out", value)
        }))
        .unwrap()
}

pub(crate) fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub(crate) fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}
