//! FIFO lot queue for a single risk pair.
//!
//! The queue owns two ordered sequences: open lots in FIFO order (insertion
//! order equals `(open_timestamp, lot_id)` order because lots are created in
//! dispatch order) and an append-only closed-lot history. Iteration is always
//! by insertion order; no hash maps are involved anywhere in lot logic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use fxdesk_types::Side;

use crate::error::LotError;
use crate::lot::Lot;

/// Result of matching part of an incoming leg against one open lot.
#[derive(Debug, Clone, PartialEq)]
pub struct LotMatch {
    /// Id of the matched open lot.
    pub matched_lot_id: u64,
    /// Risk pair the match occurred in.
    pub risk_pair: String,
    /// Matched quantity, positive.
    pub matched_quantity: Decimal,
    /// Realized P&L in the risk pair's quote currency.
    pub realized_pnl: Decimal,
    /// Price of the incoming leg.
    pub close_price: Decimal,
    /// Event time of the match.
    pub close_timestamp: DateTime<Utc>,
}

/// FIFO queue of lots for a single risk pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LotQueue {
    risk_pair: String,
    open_lots: Vec<Lot>,
    closed_lots: Vec<Lot>,
}

impl LotQueue {
    pub fn new(risk_pair: impl Into<String>) -> Self {
        Self {
            risk_pair: risk_pair.into(),
            open_lots: Vec::new(),
            closed_lots: Vec::new(),
        }
    }

    pub fn risk_pair(&self) -> &str {
        &self.risk_pair
    }

    /// Appends a newly created lot to the open sequence.
    pub fn push_open(&mut self, lot: Lot) -> Result<(), LotError> {
        if lot.risk_pair != self.risk_pair {
            return Err(LotError::QueueMismatch {
                lot: lot.risk_pair,
                queue: self.risk_pair.clone(),
            });
        }
        if lot.quantity <= Decimal::ZERO {
            return Err(LotError::InvalidQuantity(lot.quantity));
        }
        self.open_lots.push(lot);
        Ok(())
    }

    /// Matches an incoming leg of `side` against open lots of the opposite
    /// side, oldest first.
    ///
    /// Returns the matches in FIFO order together with the unmatched
    /// remainder of the leg quantity. Fully matched lots move to the closed
    /// history; a partially matched head lot is replaced by a reduced copy.
    pub fn match_fifo(
        &mut self,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<(Vec<LotMatch>, Decimal), LotError> {
        if quantity <= Decimal::ZERO {
            return Err(LotError::InvalidQuantity(quantity));
        }

        let opposite = side.inverse();
        let mut matches = Vec::new();
        let mut remaining = quantity;
        let mut still_open = Vec::with_capacity(self.open_lots.len());

        for lot in self.open_lots.drain(..) {
            if remaining <= Decimal::ZERO || lot.side != opposite {
                still_open.push(lot);
                continue;
            }

            let matched_quantity = lot.quantity.min(remaining);
            let realized_pnl = lot.realized_pnl(matched_quantity, price);

            if matched_quantity == lot.quantity {
                self.closed_lots.push(lot.closed_at(timestamp, price));
            } else {
                still_open.push(lot.reduced_by(matched_quantity)?);
            }

            matches.push(LotMatch {
                matched_lot_id: lot.lot_id,
                risk_pair: self.risk_pair.clone(),
                matched_quantity,
                realized_pnl,
                close_price: price,
                close_timestamp: timestamp,
            });

            remaining -= matched_quantity;
        }

        self.open_lots = still_open;
        Ok((matches, remaining))
    }

    /// Net open position: `Σ quantity · (+1 BUY / −1 SELL)`.
    pub fn net_position(&self) -> Decimal {
        self.open_lots.iter().map(Lot::signed_quantity).sum()
    }

    /// Total mark-to-market P&L across open lots at the given mid.
    pub fn unrealized_pnl(&self, current_mid: Decimal) -> Decimal {
        self.open_lots
            .iter()
            .map(|lot| lot.unrealized_pnl(current_mid))
            .sum()
    }

    pub fn open_lots(&self) -> &[Lot] {
        &self.open_lots
    }

    pub fn closed_lots(&self) -> &[Lot] {
        &self.closed_lots
    }

    /// Queue state for snapshot output.
    pub fn to_json(&self) -> Value {
        json!({
            "risk_pair": &self.risk_pair,
            "open_lot_count": self.open_lots.len(),
            "closed_lot_count": self.closed_lots.len(),
            "net_position": self.net_position().to_string(),
            "open_lots": &self.open_lots,
        })
    }
}
