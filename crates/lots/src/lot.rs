//! Individual lot records.
//!
//! A lot is one opening of risk in a direct risk pair. Lots never mutate:
//! a partial match produces a new lot with reduced quantity, and a full
//! match produces a closed copy that moves to the queue's history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use fxdesk_types::Side;

use crate::error::LotError;

/// An immutable opening of risk in a direct risk pair.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Lot {
    /// Globally unique id, assigned from the lot manager's counter in
    /// dispatch order.
    pub lot_id: u64,
    /// Direct pair the lot lives in, quoted against the reporting currency.
    pub risk_pair: String,
    /// Desk side of the opening.
    pub side: Side,
    /// Remaining quantity; strictly positive while the lot is open.
    pub quantity: Decimal,
    /// Quantity at open.
    pub original_quantity: Decimal,
    /// Price recorded at open, in the risk pair's quote currency.
    pub trade_price: Decimal,
    /// Event time of the opening trade.
    #[serde(with = "fxdesk_types::timestamp")]
    pub open_timestamp: DateTime<Utc>,
    /// Trade that originated this lot.
    pub origin_trade_id: String,
    /// Index of the decomposed leg within the originating trade.
    pub origin_leg_index: usize,
    /// The client's traded pair, which may differ from `risk_pair` for
    /// decomposed crosses.
    pub origin_pair: String,
    /// Set when the lot is fully matched.
    #[serde(
        with = "fxdesk_types::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub close_timestamp: Option<DateTime<Utc>>,
    /// Price of the closing match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_price: Option<Decimal>,
}

impl Lot {
    pub fn is_closed(&self) -> bool {
        self.close_timestamp.is_some()
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    /// Quantity signed by side: positive for BUY, negative for SELL.
    pub fn signed_quantity(&self) -> Decimal {
        match self.side {
            Side::Buy => self.quantity,
            Side::Sell => -self.quantity,
        }
    }

    /// Returns a copy with `amount` removed from the remaining quantity.
    pub fn reduced_by(&self, amount: Decimal) -> Result<Self, LotError> {
        if amount <= Decimal::ZERO {
            return Err(LotError::InvalidQuantity(amount));
        }
        if amount > self.quantity {
            return Err(LotError::ReduceExceedsQuantity {
                lot_id: self.lot_id,
                amount,
                remaining: self.quantity,
            });
        }
        Ok(Self {
            quantity: self.quantity - amount,
            ..self.clone()
        })
    }

    /// Returns a fully-matched copy with zero quantity and close metadata.
    pub fn closed_at(&self, close_timestamp: DateTime<Utc>, close_price: Decimal) -> Self {
        Self {
            quantity: Decimal::ZERO,
            close_timestamp: Some(close_timestamp),
            close_price: Some(close_price),
            ..self.clone()
        }
    }

    /// Mark-to-market P&L on the remaining quantity at the given mid.
    ///
    /// Closed lots carry no unrealized P&L.
    pub fn unrealized_pnl(&self, current_mid: Decimal) -> Decimal {
        if self.is_closed() {
            return Decimal::ZERO;
        }
        match self.side {
            Side::Buy => (current_mid - self.trade_price) * self.quantity,
            Side::Sell => (self.trade_price - current_mid) * self.quantity,
        }
    }

    /// Realized P&L for matching `matched_quantity` at `close_price`,
    /// in the risk pair's quote currency.
    pub fn realized_pnl(&self, matched_quantity: Decimal, close_price: Decimal) -> Decimal {
        match self.side {
            Side::Buy => (close_price - self.trade_price) * matched_quantity,
            Side::Sell => (self.trade_price - close_price) * matched_quantity,
        }
    }
}
