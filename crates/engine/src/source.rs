//! Event source and record sink contracts.
//!
//! A source is a finite producer of events; the processor pulls all of them
//! eagerly and establishes the global order itself, so sources may present
//! events in any arrival order. A sink accepts output records and must
//! preserve the order it receives them in.

use fxdesk_types::{Event, OutputRecord};

use crate::error::EngineError;

/// A finite ordered producer of events.
pub trait EventSource {
    /// Identifying name used in logs.
    fn name(&self) -> &str;

    /// Drains all events from the source. Called exactly once per run.
    fn pull(&mut self) -> Vec<Event>;
}

/// An in-memory event source.
#[derive(Debug)]
pub struct VecSource {
    name: String,
    events: Vec<Event>,
}

impl VecSource {
    pub fn new(name: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }
}

impl EventSource for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn pull(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

/// An ordered consumer of output records.
pub trait RecordSink {
    /// Accepts the next record.
    ///
    /// # Errors
    /// Implementations may fail on I/O; a sink failure is fatal to the run.
    fn accept(&mut self, record: OutputRecord) -> Result<(), EngineError>;
}

/// A sink collecting records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<OutputRecord>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<OutputRecord> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn accept(&mut self, record: OutputRecord) -> Result<(), EngineError> {
        self.records.push(record);
        Ok(())
    }
}
