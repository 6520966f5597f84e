//! Engine accounting state and its pure transitions.
//!
//! The state is a value: every transition consumes the current instance and
//! returns a new one, so no aliasing survives a handler boundary. All maps
//! are `BTreeMap` so iteration and serialization are sorted by key on every
//! run.
//!
//! Cash-balance sign convention, desk perspective: positive means the desk
//! holds that currency, negative means it owes it. Positions are signed
//! base-currency notionals per pair: positive long base, negative short.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use fxdesk_lots::LotManager;
use fxdesk_types::{Side, pair, timestamp};

use crate::error::PortfolioError;

/// Most-recent market quote for a currency pair.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MarketRate {
    pub bid: Decimal,
    pub ask: Decimal,
    /// Mid price, used for all internal valuation.
    pub mid: Decimal,
    /// Event time of the quote.
    #[serde(with = "fxdesk_types::timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Complete simulation state.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    cash_balances: BTreeMap<String, Decimal>,
    positions: BTreeMap<String, Decimal>,
    market_rates: BTreeMap<String, MarketRate>,
    config_values: BTreeMap<String, String>,
    reporting_currency: String,
    event_count: u64,
    lot_manager: Option<LotManager>,
}

impl EngineState {
    /// Creates an empty state with the given reporting currency and no lot
    /// tracking.
    pub fn new(reporting_currency: impl Into<String>) -> Self {
        Self {
            cash_balances: BTreeMap::new(),
            positions: BTreeMap::new(),
            market_rates: BTreeMap::new(),
            config_values: BTreeMap::new(),
            reporting_currency: reporting_currency.into(),
            event_count: 0,
            lot_manager: None,
        }
    }

    /// Cash balance for a currency; absent keys are zero.
    pub fn cash_balance(&self, currency: &str) -> Decimal {
        self.cash_balances
            .get(currency)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn cash_balances(&self) -> &BTreeMap<String, Decimal> {
        &self.cash_balances
    }

    /// Net position for a pair; absent keys are zero.
    pub fn position(&self, currency_pair: &str) -> Decimal {
        self.positions
            .get(currency_pair)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn positions(&self) -> &BTreeMap<String, Decimal> {
        &self.positions
    }

    pub fn market_rate(&self, currency_pair: &str) -> Option<&MarketRate> {
        self.market_rates.get(currency_pair)
    }

    pub fn market_rates(&self) -> &BTreeMap<String, MarketRate> {
        &self.market_rates
    }

    /// Free-form configuration value stored by `ConfigUpdate` events.
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config_values.get(key).map(String::as_str)
    }

    pub fn reporting_currency(&self) -> &str {
        &self.reporting_currency
    }

    /// Number of events dispatched since initialization.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn lot_manager(&self) -> Option<&LotManager> {
        self.lot_manager.as_ref()
    }

    /// Returns a new state with `delta` added to the currency's balance.
    #[must_use]
    pub fn with_cash(mut self, currency: &str, delta: Decimal) -> Self {
        let balance = self.cash_balances.entry(currency.to_string()).or_default();
        *balance += delta;
        self
    }

    /// Returns a new state with `delta` added to the pair's net position.
    #[must_use]
    pub fn with_position(mut self, currency_pair: &str, delta: Decimal) -> Self {
        let position = self
            .positions
            .entry(currency_pair.to_string())
            .or_default();
        *position += delta;
        self
    }

    /// Returns a new state with the pair's quote replaced.
    #[must_use]
    pub fn with_market_rate(mut self, currency_pair: &str, rate: MarketRate) -> Self {
        self.market_rates.insert(currency_pair.to_string(), rate);
        self
    }

    /// Returns a new state with the reporting currency replaced.
    #[must_use]
    pub fn with_reporting_currency(mut self, currency: impl Into<String>) -> Self {
        self.reporting_currency = currency.into();
        self
    }

    /// Returns a new state with a free-form config value stored.
    #[must_use]
    pub fn with_config_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.config_values.insert(key.to_string(), value.into());
        self
    }

    /// Returns a new state owning the given lot manager.
    #[must_use]
    pub fn with_lot_manager(mut self, manager: LotManager) -> Self {
        self.lot_manager = Some(manager);
        self
    }

    /// Returns a new state with the event counter advanced by one.
    #[must_use]
    pub fn increment_event_count(mut self) -> Self {
        self.event_count += 1;
        self
    }

    /// Applies a trade's cash legs and position update atomically.
    ///
    /// Desk perspective: on a client BUY the desk sells base and receives
    /// quote; on a client SELL the desk buys base and pays quote.
    ///
    /// # Errors
    /// Returns [`PortfolioError::MalformedPair`] when the pair cannot be
    /// split.
    pub fn apply_trade(
        self,
        currency_pair: &str,
        side: Side,
        notional: Decimal,
        price: Decimal,
    ) -> Result<Self, PortfolioError> {
        let (base, quote) = pair::split(currency_pair)
            .ok_or_else(|| PortfolioError::MalformedPair(currency_pair.to_string()))?;
        let quote_amount = notional * price;

        let state = match side {
            Side::Buy => self
                .with_cash(base, -notional)
                .with_cash(quote, quote_amount)
                .with_position(currency_pair, -notional),
            Side::Sell => self
                .with_cash(base, notional)
                .with_cash(quote, -quote_amount)
                .with_position(currency_pair, notional),
        };
        Ok(state)
    }

    /// Serializes the full state, sorted-by-key, for the final-state output.
    pub fn to_json(&self, as_of: Option<DateTime<Utc>>) -> Value {
        let cash: BTreeMap<&String, String> = self
            .cash_balances
            .iter()
            .map(|(ccy, amount)| (ccy, amount.to_string()))
            .collect();
        let positions: BTreeMap<&String, String> = self
            .positions
            .iter()
            .map(|(pair, net)| (pair, net.to_string()))
            .collect();
        let rates: BTreeMap<&String, Value> = self
            .market_rates
            .iter()
            .map(|(pair, rate)| {
                (
                    pair,
                    json!({
                        "bid": rate.bid.to_string(),
                        "ask": rate.ask.to_string(),
                        "mid": rate.mid.to_string(),
                        "timestamp": timestamp::to_string(&rate.timestamp),
                    }),
                )
            })
            .collect();

        json!({
            "as_of": as_of.map(|ts| timestamp::to_string(&ts)),
            "cash_balances": cash,
            "positions": positions,
            "market_rates": rates,
            "config_values": &self.config_values,
            "reporting_currency": &self.reporting_currency,
            "event_count": self.event_count,
            "lot_manager": self.lot_manager.as_ref().map(LotManager::to_json),
        })
    }
}
