//! FX Desk Types
//!
//! Core data structures for the FX dealing-desk simulation engine.
//! This crate provides the event schema, the output-record contract,
//! the configuration schema, and the shared serialization conventions
//! (exact decimals, microsecond UTC timestamps, sorted-key maps).

#![deny(clippy::all)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]

/// Configuration schema types.
pub mod config;
/// Configuration error types.
pub mod error;
/// Event schema and ordering key.
pub mod event;
/// Currency-pair string helpers.
pub mod pair;
/// Output record contract.
pub mod record;
/// Timestamp serialization helpers.
pub mod timestamp;

// Re-export main types for convenience
pub use config::{
    InputsConfig, LotTrackingConfig, MatchingRule, OutputsConfig, SimConfig,
};
pub use error::ConfigError;
pub use event::{
    ClientTrade, ClockTick, ConfigUpdate, Event, EventPayload, EventType, HedgeFill, HedgeOrder,
    MarketUpdate, ParseSideError, Side,
};
pub use record::{OutputRecord, RecordType};
