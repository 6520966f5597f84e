//! Output record contract.
//!
//! Handlers communicate exclusively through [`OutputRecord`] values which
//! the processor forwards, in order, to the sink. The `data` map uses
//! `BTreeMap` so every serialization is sorted-by-key and therefore
//! byte-identical across runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

/// Closed set of record types a handler may emit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Client trade applied to cash and positions.
    ClientTrade,
    /// Market quote stored in the rate cache.
    MarketUpdate,
    /// Hedge order logged.
    HedgeOrder,
    /// Hedge fill applied to cash and positions.
    HedgeFill,
    /// Configuration change applied.
    ConfigUpdate,
    /// Derived-state snapshot from a clock tick.
    Snapshot,
    /// New lot opened in a risk-pair queue.
    LotCreated,
    /// Incoming leg matched against an open lot.
    LotMatch,
    /// Lot layer skipped for a trade (missing rate or decomposition failure).
    LotTrackingError,
    /// Event payload violated its schema; state unchanged.
    ValidationError,
    /// Invariant violation; the run terminates after this record.
    FatalError,
}

impl RecordType {
    /// Wire representation in `snake_case`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::ClientTrade => "client_trade",
            RecordType::MarketUpdate => "market_update",
            RecordType::HedgeOrder => "hedge_order",
            RecordType::HedgeFill => "hedge_fill",
            RecordType::ConfigUpdate => "config_update",
            RecordType::Snapshot => "snapshot",
            RecordType::LotCreated => "lot_created",
            RecordType::LotMatch => "lot_match",
            RecordType::LotTrackingError => "lot_tracking_error",
            RecordType::ValidationError => "validation_error",
            RecordType::FatalError => "fatal_error",
        }
    }
}

/// A single output record emitted by a handler.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputRecord {
    /// Timestamp of the event that produced this record.
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Record type.
    pub record_type: RecordType,
    /// Structured payload; keys and values are specified by the emitting
    /// handler. Decimals are canonical decimal strings, never floats.
    pub data: BTreeMap<String, Value>,
}

impl OutputRecord {
    /// Creates an empty record of the given type.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, record_type: RecordType) -> Self {
        Self {
            timestamp,
            record_type,
            data: BTreeMap::new(),
        }
    }

    /// Adds a string field.
    #[must_use]
    pub fn with_str(mut self, key: &str, value: impl Into<String>) -> Self {
        self.data.insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// Adds a decimal field, serialized as a canonical decimal string.
    #[must_use]
    pub fn with_decimal(mut self, key: &str, value: Decimal) -> Self {
        self.data
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Adds an arbitrary JSON value field.
    #[must_use]
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}
