pub mod components;
pub mod connections;
pub mod error;
pub mod event_queue;
pub mod execution;
pub mod resolve;
pub mod timer;
pub mod trace;
pub mod values;

#[cfg(test)]
mod tests;
