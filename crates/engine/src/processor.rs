//! Deterministic event processor.
//!
//! Pulls all events eagerly, establishes the global order with a stable
//! sort on `(timestamp, sequence_id)`, then dispatches one event at a time
//! on a single thread. Records are forwarded to the sink in
//! `(dispatch index, intra-handler order)`. Handler errors are fatal: the
//! processor emits a final `fatal_error` record and re-raises.

use chrono::{DateTime, Utc};

use fxdesk_portfolio::EngineState;
use fxdesk_types::{Event, EventPayload, OutputRecord, RecordType, timestamp};

use crate::error::EngineError;
use crate::handlers;
use crate::source::{EventSource, RecordSink};

const PROGRESS_INTERVAL: usize = 10_000;

/// Deterministic event processor owning the engine state.
pub struct EventProcessor {
    state: EngineState,
}

impl EventProcessor {
    pub fn new(initial_state: EngineState) -> Self {
        Self {
            state: initial_state,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> EngineState {
        self.state
    }

    /// Drains all sources, merges their events, and processes them.
    ///
    /// The partitioning of events across sources has no effect on the
    /// output: the merged vector is re-sorted before dispatch.
    ///
    /// # Errors
    /// See [`EventProcessor::process_events`].
    pub fn run(
        &mut self,
        sources: Vec<Box<dyn EventSource>>,
        sink: &mut dyn RecordSink,
    ) -> Result<(), EngineError> {
        let mut events = Vec::new();
        for mut source in sources {
            let pulled = source.pull();
            tracing::debug!(source = source.name(), count = pulled.len(), "source drained");
            events.extend(pulled);
        }
        self.process_events(events, sink)
    }

    /// Sorts events by the global ordering key and dispatches each in turn.
    ///
    /// # Errors
    /// [`EngineError::DuplicateEventKey`] when two events share an ordering
    /// key, or the first handler/sink error. In both cases a final
    /// `fatal_error` record is emitted before returning.
    pub fn process_events(
        &mut self,
        mut events: Vec<Event>,
        sink: &mut dyn RecordSink,
    ) -> Result<(), EngineError> {
        // Vec::sort_by is stable; with unique keys the result is identical
        // for every arrival order.
        events.sort_by(|a, b| a.key().cmp(&b.key()));

        if let Some((ts, sequence_id)) = find_duplicate_key(&events) {
            let err = EngineError::DuplicateEventKey {
                timestamp: timestamp::to_string(&ts),
                sequence_id,
            };
            self.emit_fatal(ts, &err, sink);
            return Err(err);
        }

        tracing::info!(event_count = events.len(), "processing started");

        for (idx, event) in events.iter().enumerate() {
            self.dispatch(event, sink)?;

            if (idx + 1) % PROGRESS_INTERVAL == 0 {
                tracing::info!(processed = idx + 1, total = events.len(), "processing progress");
            }
        }

        tracing::info!(
            event_count = events.len(),
            final_event_count = self.state.event_count(),
            "processing completed"
        );
        Ok(())
    }

    fn dispatch(&mut self, event: &Event, sink: &mut dyn RecordSink) -> Result<(), EngineError> {
        tracing::debug!(
            event_type = event.event_type().as_str(),
            sequence_id = event.sequence_id,
            "dispatching event"
        );

        let state = self.state.clone();
        let result = match &event.payload {
            EventPayload::ClientTrade(trade) => {
                handlers::handle_client_trade(state, event.timestamp, trade)
            }
            EventPayload::MarketUpdate(update) => {
                handlers::handle_market_update(state, event.timestamp, update)
            }
            EventPayload::ConfigUpdate(update) => {
                handlers::handle_config_update(state, event.timestamp, update)
            }
            EventPayload::HedgeOrder(order) => {
                handlers::handle_hedge_order(state, event.timestamp, order)
            }
            EventPayload::HedgeFill(fill) => {
                handlers::handle_hedge_fill(state, event.timestamp, fill)
            }
            EventPayload::ClockTick(tick) => {
                handlers::handle_clock_tick(state, event.timestamp, tick)
            }
        };

        match result {
            Ok((next_state, records)) => {
                self.state = next_state;
                for record in records {
                    sink.accept(record)?;
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    event_type = event.event_type().as_str(),
                    sequence_id = event.sequence_id,
                    error = %err,
                    "event processing failed"
                );
                self.emit_fatal(event.timestamp, &err, sink);
                Err(err)
            }
        }
    }

    fn emit_fatal(&self, ts: DateTime<Utc>, err: &EngineError, sink: &mut dyn RecordSink) {
        let record =
            OutputRecord::new(ts, RecordType::FatalError).with_str("error", err.to_string());
        if let Err(sink_err) = sink.accept(record) {
            tracing::warn!(error = %sink_err, "failed to emit fatal_error record");
        }
    }
}

fn find_duplicate_key(events: &[Event]) -> Option<(DateTime<Utc>, u64)> {
    events
        .windows(2)
        .find(|pair| pair[0].key() == pair[1].key())
        .map(|pair| pair[1].key())
}
