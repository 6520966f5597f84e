//! Cross-trade decomposition into direct risk-pair legs.
//!
//! A trade in a risk pair maps to a single leg. A cross `A/B` maps to two
//! legs against the reporting currency `R`: the `A/R` leg carries the trade
//! notional, the `B/R` leg carries `notional * price`. Leg sides are the
//! desk's sides, already inverted from the client's. Reference prices come
//! from the converter's current mids and are the prices recorded on any
//! lots the legs open.
//!
//! Decomposition is read-only: it receives a state snapshot and returns the
//! leg list, or an error that the caller records. It never touches state.

use rust_decimal::Decimal;

use fxdesk_types::{LotTrackingConfig, Side, pair};

use crate::converter::CurrencyConverter;
use crate::error::DecomposeError;
use crate::state::EngineState;

/// One leg of a decomposed trade, in a direct risk pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedLeg {
    /// Direct pair the leg trades in.
    pub risk_pair: String,
    /// Desk side in the risk pair.
    pub side: Side,
    /// Quantity in the risk pair's base currency.
    pub quantity: Decimal,
    /// Price recorded on lots this leg opens and used for match P&L.
    pub reference_price: Decimal,
    /// The client's traded pair.
    pub origin_pair: String,
    /// Position of this leg within the trade's decomposition.
    pub leg_index: usize,
}

/// Decomposes a client trade into legs in configured risk pairs.
///
/// # Errors
/// - [`DecomposeError::PairNotTradable`] when the pair is not in
///   `trade_pairs`.
/// - [`DecomposeError::RiskPairNotConfigured`] when a derived direct pair
///   has no lot queue.
/// - [`DecomposeError::Rate`] when a required conversion rate is missing;
///   the caller records this as `missing_rate` and the trade's accounting
///   still applies.
pub fn decompose(
    state: &EngineState,
    config: &LotTrackingConfig,
    trade_pair: &str,
    client_side: Side,
    notional: Decimal,
    price: Decimal,
) -> Result<Vec<DecomposedLeg>, DecomposeError> {
    let (base, quote) = pair::split(trade_pair)
        .ok_or_else(|| DecomposeError::MalformedPair(trade_pair.to_string()))?;

    if !config.is_trade_pair(trade_pair) {
        return Err(DecomposeError::PairNotTradable(trade_pair.to_string()));
    }

    // Direct risk pair: one leg at the client's execution price.
    if config.is_risk_pair(trade_pair) {
        return Ok(vec![DecomposedLeg {
            risk_pair: trade_pair.to_string(),
            side: client_side.inverse(),
            quantity: notional,
            reference_price: price,
            origin_pair: trade_pair.to_string(),
            leg_index: 0,
        }]);
    }

    // Cross: split into base and quote legs against the reporting currency.
    let reporting = state.reporting_currency();
    let base_risk_pair = pair::join(base, reporting);
    let quote_risk_pair = pair::join(quote, reporting);

    if !config.is_risk_pair(&base_risk_pair) {
        return Err(DecomposeError::RiskPairNotConfigured(base_risk_pair));
    }
    if !config.is_risk_pair(&quote_risk_pair) {
        return Err(DecomposeError::RiskPairNotConfigured(quote_risk_pair));
    }

    let converter = CurrencyConverter::new(state);
    let base_rate = converter.rate(base, reporting)?;
    let quote_rate = converter.rate(quote, reporting)?;

    // Client BUY of A/B: the desk loses A and gains B, so it sells the
    // base leg and buys the quote leg. Client SELL inverts both.
    let desk_side_base = client_side.inverse();
    let desk_side_quote = desk_side_base.inverse();

    Ok(vec![
        DecomposedLeg {
            risk_pair: base_risk_pair,
            side: desk_side_base,
            quantity: notional,
            reference_price: base_rate,
            origin_pair: trade_pair.to_string(),
            leg_index: 0,
        },
        DecomposedLeg {
            risk_pair: quote_risk_pair,
            side: desk_side_quote,
            quantity: notional * price,
            reference_price: quote_rate,
            origin_pair: trade_pair.to_string(),
            leg_index: 1,
        },
    ])
}
