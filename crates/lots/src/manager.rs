//! Lot manager: per-risk-pair queues, the lot-id counter, and aggregate
//! P&L views.
//!
//! Queues live in a `BTreeMap` so iteration and serialization are always
//! sorted by risk pair. The id counter advances exactly once per created
//! lot, in dispatch order, which makes lot ids reproducible across runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use fxdesk_types::{LotTrackingConfig, Side};

use crate::error::LotError;
use crate::lot::Lot;
use crate::queue::{LotMatch, LotQueue};

/// A decomposed leg arriving at the lot layer. The side is the desk's side
/// in the risk pair.
#[derive(Debug, Clone, Copy)]
pub struct IncomingLeg<'a> {
    pub risk_pair: &'a str,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub origin_trade_id: &'a str,
    pub origin_leg_index: usize,
    pub origin_pair: &'a str,
}

/// What applying one leg produced: zero or more FIFO matches, and at most
/// one newly opened lot for the unmatched remainder.
#[derive(Debug, Clone)]
pub struct LegOutcome {
    pub matches: Vec<LotMatch>,
    pub opened: Option<Lot>,
}

/// Manages lot queues for all configured risk pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct LotManager {
    config: LotTrackingConfig,
    queues: BTreeMap<String, LotQueue>,
    next_lot_id: u64,
    realized_pnl: Decimal,
}

impl LotManager {
    /// Creates a manager with one empty queue per configured risk pair.
    pub fn new(config: LotTrackingConfig) -> Self {
        let queues = config
            .risk_pairs
            .iter()
            .map(|pair| (pair.clone(), LotQueue::new(pair.clone())))
            .collect();
        Self {
            config,
            queues,
            next_lot_id: 1,
            realized_pnl: Decimal::ZERO,
        }
    }

    pub fn config(&self) -> &LotTrackingConfig {
        &self.config
    }

    /// Applies one decomposed leg to its risk-pair queue.
    ///
    /// Matches against opposite-side open lots in FIFO order first; any
    /// unmatched remainder opens a new lot of the leg's side (the position
    /// has flipped or extended).
    pub fn apply_leg(
        &mut self,
        leg: &IncomingLeg<'_>,
        timestamp: DateTime<Utc>,
    ) -> Result<LegOutcome, LotError> {
        if leg.quantity <= Decimal::ZERO {
            return Err(LotError::InvalidQuantity(leg.quantity));
        }

        let queue = self
            .queues
            .get_mut(leg.risk_pair)
            .ok_or_else(|| LotError::UnknownRiskPair(leg.risk_pair.to_string()))?;

        let (matches, remaining) =
            queue.match_fifo(leg.side, leg.quantity, leg.price, timestamp)?;

        for lot_match in &matches {
            self.realized_pnl += lot_match.realized_pnl;
        }

        let opened = if remaining > Decimal::ZERO {
            let lot = Lot {
                lot_id: self.next_lot_id,
                risk_pair: leg.risk_pair.to_string(),
                side: leg.side,
                quantity: remaining,
                original_quantity: remaining,
                trade_price: leg.price,
                open_timestamp: timestamp,
                origin_trade_id: leg.origin_trade_id.to_string(),
                origin_leg_index: leg.origin_leg_index,
                origin_pair: leg.origin_pair.to_string(),
                close_timestamp: None,
                close_price: None,
            };
            self.next_lot_id += 1;
            queue.push_open(lot.clone())?;
            Some(lot)
        } else {
            None
        };

        Ok(LegOutcome { matches, opened })
    }

    /// Net open position for one risk pair; zero for unknown pairs.
    pub fn net_position(&self, risk_pair: &str) -> Decimal {
        self.queues
            .get(risk_pair)
            .map_or(Decimal::ZERO, LotQueue::net_position)
    }

    /// Net open positions for all risk pairs, sorted by pair.
    pub fn net_positions(&self) -> BTreeMap<String, Decimal> {
        self.queues
            .iter()
            .map(|(pair, queue)| (pair.clone(), queue.net_position()))
            .collect()
    }

    /// Total unrealized P&L across risk pairs, valued at the given mids.
    /// Pairs with no mid available are skipped.
    pub fn total_unrealized_pnl(&self, mids: &BTreeMap<String, Decimal>) -> Decimal {
        self.queues
            .iter()
            .filter_map(|(pair, queue)| mids.get(pair).map(|mid| queue.unrealized_pnl(*mid)))
            .sum()
    }

    /// Cumulative realized P&L across all matches so far.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn open_lot_count(&self) -> usize {
        self.queues.values().map(|q| q.open_lots().len()).sum()
    }

    pub fn closed_lot_count(&self) -> usize {
        self.queues.values().map(|q| q.closed_lots().len()).sum()
    }

    pub fn queue(&self, risk_pair: &str) -> Option<&LotQueue> {
        self.queues.get(risk_pair)
    }

    /// Queues in sorted risk-pair order.
    pub fn queues(&self) -> impl Iterator<Item = &LotQueue> {
        self.queues.values()
    }

    /// Manager state for snapshot output.
    pub fn to_json(&self) -> Value {
        let queues: BTreeMap<&String, Value> = self
            .queues
            .iter()
            .map(|(pair, queue)| (pair, queue.to_json()))
            .collect();
        let net_positions: BTreeMap<String, String> = self
            .net_positions()
            .into_iter()
            .map(|(pair, net)| (pair, net.to_string()))
            .collect();
        json!({
            "matching_rule": self.config.matching_rule,
            "risk_pairs": &self.config.risk_pairs,
            "open_lot_count": self.open_lot_count(),
            "closed_lot_count": self.closed_lot_count(),
            "realized_pnl": self.realized_pnl.to_string(),
            "net_positions": net_positions,
            "queues": queues,
        })
    }
}
