//! High-level simulation runner helpers.

use fxdesk_lots::LotManager;
use fxdesk_portfolio::EngineState;
use fxdesk_types::{Event, OutputRecord, SimConfig};

use crate::error::EngineError;
use crate::processor::EventProcessor;
use crate::source::{MemorySink, RecordSink};

/// Final state and ordered records from a completed run.
#[derive(Debug)]
pub struct SimRun {
    pub final_state: EngineState,
    pub records: Vec<OutputRecord>,
}

/// Builds the initial engine state from a validated configuration.
///
/// # Errors
/// Returns [`EngineError::Config`] when the configuration is invalid.
pub fn initial_state(config: &SimConfig) -> Result<EngineState, EngineError> {
    config.validate()?;

    let mut state = EngineState::new(config.reporting_currency.clone());
    if config.lot_tracking.enabled {
        tracing::info!(
            risk_pairs = ?config.lot_tracking.risk_pairs,
            matching_rule = ?config.lot_tracking.matching_rule,
            "lot tracking enabled"
        );
        state = state.with_lot_manager(LotManager::new(config.lot_tracking.clone()));
    }
    Ok(state)
}

/// Runs a batch of events against a fresh state into a memory sink.
///
/// # Errors
/// Propagates configuration and processing errors. On failure the
/// collected records are discarded with the sink; use [`run_events_into`]
/// with an external sink to observe the trailing `fatal_error` record.
pub fn run_events(config: &SimConfig, events: Vec<Event>) -> Result<SimRun, EngineError> {
    let state = initial_state(config)?;
    let mut processor = EventProcessor::new(state);
    let mut sink = MemorySink::new();
    processor.process_events(events, &mut sink)?;

    Ok(SimRun {
        final_state: processor.into_state(),
        records: sink.into_records(),
    })
}

/// Runs a batch of events into a caller-provided sink.
///
/// # Errors
/// Same as [`run_events`].
pub fn run_events_into(
    config: &SimConfig,
    events: Vec<Event>,
    sink: &mut dyn RecordSink,
) -> Result<EngineState, EngineError> {
    let state = initial_state(config)?;
    let mut processor = EventProcessor::new(state);
    processor.process_events(events, sink)?;
    Ok(processor.into_state())
}

/// Main entry point for embedding: receives config JSON plus events and
/// returns the completed run.
///
/// # Errors
/// [`EngineError::ConfigParse`] when the JSON cannot be parsed, otherwise
/// same as [`run_events`].
pub fn run_from_config_json(config_json: &str, events: Vec<Event>) -> Result<SimRun, EngineError> {
    let config: SimConfig =
        serde_json::from_str(config_json).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
    run_events(&config, events)
}
