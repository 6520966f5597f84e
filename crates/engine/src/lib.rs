//! FX Desk Engine
//!
//! Orchestrates the simulation: event handlers, the deterministic
//! processor (merge, sort, dispatch, emit), the source and sink
//! contracts, and the runner that wires a configuration to a run.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod handlers;
pub mod processor;
pub mod runner;
pub mod source;

pub use error::EngineError;
pub use processor::EventProcessor;
pub use runner::{SimRun, initial_state, run_events, run_events_into, run_from_config_json};
pub use source::{EventSource, MemorySink, RecordSink, VecSource};
