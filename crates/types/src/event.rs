//! Event schema for the simulation engine.
//!
//! All events are immutable values carrying the global ordering key
//! `(timestamp, sequence_id)`, which must be unique across the entire
//! input. Payload validation is deferred to the handlers so that a bad
//! row in an input file surfaces as a `validation_error` record instead
//! of aborting the run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::pair;

/// Trade side from the client's perspective.
///
/// `BUY` means the client buys the base currency; the desk takes the
/// opposite side of every client trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Base currency bought.
    Buy,
    /// Base currency sold.
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire representation (`BUY` / `SELL`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Error parsing a side string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSideError;

impl std::fmt::Display for ParseSideError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid side string, expected BUY or SELL")
    }
}

impl std::error::Error for ParseSideError {}

impl std::str::FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(ParseSideError),
        }
    }
}

/// Event variant tag used for dispatch, logging, and input-file mapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Client trade execution.
    ClientTrade,
    /// Market quote update.
    MarketUpdate,
    /// Configuration change.
    ConfigUpdate,
    /// Hedge order placement.
    HedgeOrder,
    /// Hedge order execution.
    HedgeFill,
    /// Periodic snapshot trigger.
    ClockTick,
}

impl EventType {
    /// Wire representation in `snake_case`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::ClientTrade => "client_trade",
            EventType::MarketUpdate => "market_update",
            EventType::ConfigUpdate => "config_update",
            EventType::HedgeOrder => "hedge_order",
            EventType::HedgeFill => "hedge_fill",
            EventType::ClockTick => "clock_tick",
        }
    }
}

/// Event envelope: global ordering key plus variant payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    /// Event time, UTC with microsecond precision.
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Tie-breaker for events sharing a timestamp.
    pub sequence_id: u64,
    /// Variant payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    /// The global ordering key. Unique across the whole input by contract.
    #[must_use]
    pub fn key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.sequence_id)
    }

    /// The variant tag of the payload.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Client trade execution.
    ClientTrade(ClientTrade),
    /// Market quote update.
    MarketUpdate(MarketUpdate),
    /// Configuration change.
    ConfigUpdate(ConfigUpdate),
    /// Hedge order placement.
    HedgeOrder(HedgeOrder),
    /// Hedge order execution.
    HedgeFill(HedgeFill),
    /// Periodic snapshot trigger.
    ClockTick(ClockTick),
}

impl EventPayload {
    /// The variant tag of this payload.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::ClientTrade(_) => EventType::ClientTrade,
            EventPayload::MarketUpdate(_) => EventType::MarketUpdate,
            EventPayload::ConfigUpdate(_) => EventType::ConfigUpdate,
            EventPayload::HedgeOrder(_) => EventType::HedgeOrder,
            EventPayload::HedgeFill(_) => EventType::HedgeFill,
            EventPayload::ClockTick(_) => EventType::ClockTick,
        }
    }

    /// Checks the payload against its schema constraints.
    ///
    /// # Errors
    /// Returns the violation message recorded by handlers as a
    /// `validation_error` record.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            EventPayload::ClientTrade(trade) => trade.validate(),
            EventPayload::MarketUpdate(update) => update.validate(),
            EventPayload::ConfigUpdate(update) => update.validate(),
            EventPayload::HedgeOrder(order) => order.validate(),
            EventPayload::HedgeFill(fill) => fill.validate(),
            EventPayload::ClockTick(tick) => tick.validate(),
        }
    }
}

/// Client trade execution.
///
/// Example: client buys 1M EUR/USD at 1.1000 — the desk sells 1M EUR and
/// receives 1.1M USD.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientTrade {
    /// Traded pair in `BASE/QUOTE` notation.
    pub currency_pair: String,
    /// Client side.
    pub side: Side,
    /// Base-currency amount, positive.
    pub notional: Decimal,
    /// Quote currency per unit base, positive.
    pub price: Decimal,
    /// Client identifier.
    pub client_id: String,
    /// Trade identifier.
    pub trade_id: String,
}

impl ClientTrade {
    /// Checks schema constraints.
    ///
    /// # Errors
    /// Returns the violation message.
    pub fn validate(&self) -> Result<(), String> {
        if pair::split(&self.currency_pair).is_none() {
            return Err(format!("malformed currency pair {}", self.currency_pair));
        }
        if self.notional <= Decimal::ZERO {
            return Err(format!("notional must be positive, got {}", self.notional));
        }
        if self.price <= Decimal::ZERO {
            return Err(format!("price must be positive, got {}", self.price));
        }
        Ok(())
    }
}

/// Market quote update for a currency pair.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarketUpdate {
    /// Quoted pair in `BASE/QUOTE` notation.
    pub currency_pair: String,
    /// Price the desk can sell at.
    pub bid: Decimal,
    /// Price the desk can buy at.
    pub ask: Decimal,
    /// Mid price, used for all internal valuation.
    pub mid: Decimal,
}

impl MarketUpdate {
    /// Checks schema constraints, including `bid <= mid <= ask`.
    ///
    /// # Errors
    /// Returns the violation message.
    pub fn validate(&self) -> Result<(), String> {
        if pair::split(&self.currency_pair).is_none() {
            return Err(format!("malformed currency pair {}", self.currency_pair));
        }
        if self.bid <= Decimal::ZERO || self.ask <= Decimal::ZERO || self.mid <= Decimal::ZERO {
            return Err("all prices must be positive".to_string());
        }
        if self.bid > self.ask {
            return Err(format!("bid {} must be <= ask {}", self.bid, self.ask));
        }
        if self.mid < self.bid || self.mid > self.ask {
            return Err(format!(
                "mid {} must be between bid {} and ask {}",
                self.mid, self.bid, self.ask
            ));
        }
        Ok(())
    }
}

/// Configuration change applied mid-stream.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfigUpdate {
    /// Configuration key; `reporting_currency` is interpreted by the state,
    /// all other keys are stored in the free-form config map.
    pub config_key: String,
    /// New value.
    pub config_value: String,
}

impl ConfigUpdate {
    /// Checks schema constraints.
    ///
    /// # Errors
    /// Returns the violation message.
    pub fn validate(&self) -> Result<(), String> {
        if self.config_key.is_empty() {
            return Err("config_key cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Hedge order placement. Intent only; state is unaffected until the
/// corresponding [`HedgeFill`] arrives.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HedgeOrder {
    /// Order identifier.
    pub order_id: String,
    /// Hedged pair in `BASE/QUOTE` notation.
    pub currency_pair: String,
    /// Order side.
    pub side: Side,
    /// Base-currency amount, positive.
    pub notional: Decimal,
    /// Limit price; `None` for market orders.
    pub limit_price: Option<Decimal>,
}

impl HedgeOrder {
    /// Checks schema constraints.
    ///
    /// # Errors
    /// Returns the violation message.
    pub fn validate(&self) -> Result<(), String> {
        if pair::split(&self.currency_pair).is_none() {
            return Err(format!("malformed currency pair {}", self.currency_pair));
        }
        if self.notional <= Decimal::ZERO {
            return Err(format!("notional must be positive, got {}", self.notional));
        }
        if let Some(limit) = self.limit_price
            && limit <= Decimal::ZERO
        {
            return Err(format!("limit_price must be positive, got {limit}"));
        }
        Ok(())
    }
}

/// Hedge order execution. Applies accounting like a client trade, plus an
/// optional slippage cost in the quote currency.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HedgeFill {
    /// Order identifier.
    pub order_id: String,
    /// Hedged pair in `BASE/QUOTE` notation.
    pub currency_pair: String,
    /// Order side.
    pub side: Side,
    /// Base-currency amount, positive.
    pub notional: Decimal,
    /// Execution price, positive.
    pub fill_price: Decimal,
    /// Slippage cost in the quote currency.
    pub slippage: Decimal,
}

impl HedgeFill {
    /// Checks schema constraints.
    ///
    /// # Errors
    /// Returns the violation message.
    pub fn validate(&self) -> Result<(), String> {
        if pair::split(&self.currency_pair).is_none() {
            return Err(format!("malformed currency pair {}", self.currency_pair));
        }
        if self.notional <= Decimal::ZERO {
            return Err(format!("notional must be positive, got {}", self.notional));
        }
        if self.fill_price <= Decimal::ZERO {
            return Err(format!(
                "fill_price must be positive, got {}",
                self.fill_price
            ));
        }
        Ok(())
    }
}

/// Periodic clock tick triggering a derived-state snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClockTick {
    /// Free-form tick identifier, e.g. `EOD` or `T+5H`.
    pub tick_label: String,
}

impl ClockTick {
    /// Checks schema constraints.
    ///
    /// # Errors
    /// Returns the violation message.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_label.is_empty() {
            return Err("tick_label cannot be empty".to_string());
        }
        Ok(())
    }
}
