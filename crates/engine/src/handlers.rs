//! Event handlers - pure functions that transform state.
//!
//! Each handler takes the current state by value plus one event payload and
//! returns the next state with the records to emit, in order. Schema
//! violations become `validation_error` records with the state otherwise
//! unchanged; lot-layer failures on trades become `lot_tracking_error`
//! records while the cash and position accounting still applies. Every
//! handler advances the event counter, including rejections, so the counter
//! always equals the number of dispatched events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use fxdesk_lots::{IncomingLeg, Lot, LotMatch};
use fxdesk_portfolio::{
    CurrencyConverter, DecomposedLeg, EngineState, MarketRate, decompose,
};
use fxdesk_types::{
    ClientTrade, ClockTick, ConfigUpdate, EventType, HedgeFill, HedgeOrder, LotTrackingConfig,
    MarketUpdate, OutputRecord, RecordType, pair,
};

use crate::error::EngineError;

/// Next state plus the records to forward to the sink, in order.
pub type HandlerOutput = (EngineState, Vec<OutputRecord>);

const REPORTING_CURRENCY_KEY: &str = "reporting_currency";

/// Handles a client trade: accounting via `apply_trade`, then the lot layer
/// when tracking is enabled.
pub fn handle_client_trade(
    state: EngineState,
    timestamp: DateTime<Utc>,
    trade: &ClientTrade,
) -> Result<HandlerOutput, EngineError> {
    if let Err(reason) = trade.validate() {
        return Ok(reject(state, timestamp, EventType::ClientTrade, reason));
    }
    let Some((base, quote)) = pair::split(&trade.currency_pair) else {
        return Ok(reject(
            state,
            timestamp,
            EventType::ClientTrade,
            format!("malformed currency pair {}", trade.currency_pair),
        ));
    };

    let mut records = Vec::new();
    let mut state =
        state.apply_trade(&trade.currency_pair, trade.side, trade.notional, trade.price)?;

    records.push(
        OutputRecord::new(timestamp, RecordType::ClientTrade)
            .with_str("trade_id", &trade.trade_id)
            .with_str("client_id", &trade.client_id)
            .with_str("currency_pair", &trade.currency_pair)
            .with_str("side", trade.side.as_str())
            .with_decimal("notional", trade.notional)
            .with_decimal("price", trade.price)
            .with_decimal("quote_amount", trade.notional * trade.price)
            .with_str("base_currency", base)
            .with_str("quote_currency", quote),
    );

    if let Some(config) = lot_config(&state) {
        match decompose(
            &state,
            &config,
            &trade.currency_pair,
            trade.side,
            trade.notional,
            trade.price,
        ) {
            Ok(legs) => {
                state = apply_lot_legs(state, timestamp, &trade.trade_id, &legs, &mut records)?;
            }
            Err(err) => records.push(lot_tracking_error(
                timestamp,
                &trade.trade_id,
                &trade.currency_pair,
                err.reason(),
                &err.to_string(),
            )),
        }
    }

    Ok((state.increment_event_count(), records))
}

/// Handles a market update: validates the quote and stores it in the rate
/// cache.
pub fn handle_market_update(
    state: EngineState,
    timestamp: DateTime<Utc>,
    update: &MarketUpdate,
) -> Result<HandlerOutput, EngineError> {
    if let Err(reason) = update.validate() {
        return Ok(reject(state, timestamp, EventType::MarketUpdate, reason));
    }

    let state = state.with_market_rate(
        &update.currency_pair,
        MarketRate {
            bid: update.bid,
            ask: update.ask,
            mid: update.mid,
            timestamp,
        },
    );

    let record = OutputRecord::new(timestamp, RecordType::MarketUpdate)
        .with_str("currency_pair", &update.currency_pair)
        .with_decimal("bid", update.bid)
        .with_decimal("ask", update.ask)
        .with_decimal("mid", update.mid);

    Ok((state.increment_event_count(), vec![record]))
}

/// Handles a configuration update. `reporting_currency` is interpreted by
/// the state; anything else lands in the free-form config map.
pub fn handle_config_update(
    state: EngineState,
    timestamp: DateTime<Utc>,
    update: &ConfigUpdate,
) -> Result<HandlerOutput, EngineError> {
    if let Err(reason) = update.validate() {
        return Ok(reject(state, timestamp, EventType::ConfigUpdate, reason));
    }

    let state = if update.config_key == REPORTING_CURRENCY_KEY {
        state.with_reporting_currency(update.config_value.clone())
    } else {
        state.with_config_value(&update.config_key, update.config_value.clone())
    };

    let record = OutputRecord::new(timestamp, RecordType::ConfigUpdate)
        .with_str("config_key", &update.config_key)
        .with_str("config_value", &update.config_value);

    Ok((state.increment_event_count(), vec![record]))
}

/// Handles a hedge order. Intent only: the order is logged and no state
/// beyond the event counter changes until the fill arrives.
pub fn handle_hedge_order(
    state: EngineState,
    timestamp: DateTime<Utc>,
    order: &HedgeOrder,
) -> Result<HandlerOutput, EngineError> {
    if let Err(reason) = order.validate() {
        return Ok(reject(state, timestamp, EventType::HedgeOrder, reason));
    }

    let limit_price = order
        .limit_price
        .map_or(Value::Null, |price| Value::String(price.to_string()));

    let record = OutputRecord::new(timestamp, RecordType::HedgeOrder)
        .with_str("order_id", &order.order_id)
        .with_str("currency_pair", &order.currency_pair)
        .with_str("side", order.side.as_str())
        .with_decimal("notional", order.notional)
        .with_value("limit_price", limit_price);

    Ok((state.increment_event_count(), vec![record]))
}

/// Handles a hedge fill: accounting identical to a client trade at the fill
/// price, a slippage charge against quote-currency cash, and optionally the
/// lot layer.
pub fn handle_hedge_fill(
    state: EngineState,
    timestamp: DateTime<Utc>,
    fill: &HedgeFill,
) -> Result<HandlerOutput, EngineError> {
    if let Err(reason) = fill.validate() {
        return Ok(reject(state, timestamp, EventType::HedgeFill, reason));
    }
    let Some((_, quote)) = pair::split(&fill.currency_pair) else {
        return Ok(reject(
            state,
            timestamp,
            EventType::HedgeFill,
            format!("malformed currency pair {}", fill.currency_pair),
        ));
    };
    let quote = quote.to_string();

    let mut records = Vec::new();
    let mut state = state.apply_trade(
        &fill.currency_pair,
        fill.side,
        fill.notional,
        fill.fill_price,
    )?;

    if !fill.slippage.is_zero() {
        state = state.with_cash(&quote, -fill.slippage);
    }

    records.push(
        OutputRecord::new(timestamp, RecordType::HedgeFill)
            .with_str("order_id", &fill.order_id)
            .with_str("currency_pair", &fill.currency_pair)
            .with_str("side", fill.side.as_str())
            .with_decimal("notional", fill.notional)
            .with_decimal("fill_price", fill.fill_price)
            .with_decimal("slippage", fill.slippage),
    );

    if let Some(config) = lot_config(&state)
        && config.track_hedge_fills
    {
        if config.is_hedge_pair(&fill.currency_pair) {
            // hedge pairs are a subset of risk pairs, so always a direct leg
            let leg = DecomposedLeg {
                risk_pair: fill.currency_pair.clone(),
                side: fill.side.inverse(),
                quantity: fill.notional,
                reference_price: fill.fill_price,
                origin_pair: fill.currency_pair.clone(),
                leg_index: 0,
            };
            state = apply_lot_legs(state, timestamp, &fill.order_id, &[leg], &mut records)?;
        } else {
            records.push(lot_tracking_error(
                timestamp,
                &fill.order_id,
                &fill.currency_pair,
                "decomposition_error",
                &format!("{} is not a configured hedge pair", fill.currency_pair),
            ));
        }
    }

    Ok((state.increment_event_count(), records))
}

/// Handles a clock tick: snapshots all derived quantities into a single
/// `snapshot` record. Only the event counter changes.
pub fn handle_clock_tick(
    state: EngineState,
    timestamp: DateTime<Utc>,
    tick: &ClockTick,
) -> Result<HandlerOutput, EngineError> {
    if let Err(reason) = tick.validate() {
        return Ok(reject(state, timestamp, EventType::ClockTick, reason));
    }

    let converter = CurrencyConverter::new(&state);
    let mut exposures = BTreeMap::new();
    let mut total_equity = Decimal::ZERO;
    for (currency, balance) in state.cash_balances() {
        match converter.convert_to_reporting(*balance, currency) {
            Ok(converted) => {
                total_equity += converted;
                exposures.insert(currency.clone(), converted);
            }
            Err(err) => {
                tracing::debug!(currency = %currency, error = %err, "exposure skipped, rate unresolvable");
            }
        }
    }

    let mut record = OutputRecord::new(timestamp, RecordType::Snapshot)
        .with_str("tick_label", &tick.tick_label)
        .with_value("cash_balances", decimal_map(state.cash_balances()))
        .with_value("positions", decimal_map(state.positions()))
        .with_value("exposures", decimal_map(&exposures))
        .with_decimal("total_equity", total_equity)
        .with_str("reporting_currency", state.reporting_currency())
        .with_value("event_count", Value::from(state.event_count() + 1));

    if let Some(manager) = state.lot_manager().filter(|m| m.config().enabled) {
        let mids: BTreeMap<String, Decimal> = manager
            .queues()
            .filter_map(|queue| {
                state
                    .market_rate(queue.risk_pair())
                    .map(|rate| (queue.risk_pair().to_string(), rate.mid))
            })
            .collect();

        record = record
            .with_value("net_positions", decimal_map(&manager.net_positions()))
            .with_decimal("unrealized_pnl", manager.total_unrealized_pnl(&mids))
            .with_decimal("realized_pnl", manager.realized_pnl())
            .with_value("open_lots", Value::from(manager.open_lot_count()))
            .with_value("closed_lots", Value::from(manager.closed_lot_count()));
    }

    Ok((state.increment_event_count(), vec![record]))
}

/// The active lot configuration, when tracking is enabled.
fn lot_config(state: &EngineState) -> Option<LotTrackingConfig> {
    state
        .lot_manager()
        .map(|manager| manager.config().clone())
        .filter(|config| config.enabled)
}

/// Runs decomposed legs through the lot manager, emitting `lot_match` and
/// `lot_created` records per leg in order. Legs are matched independently
/// against their own queues; no cross-leg netting.
fn apply_lot_legs(
    state: EngineState,
    timestamp: DateTime<Utc>,
    origin_trade_id: &str,
    legs: &[DecomposedLeg],
    records: &mut Vec<OutputRecord>,
) -> Result<EngineState, EngineError> {
    let Some(mut manager) = state.lot_manager().cloned() else {
        return Ok(state);
    };

    for leg in legs {
        let outcome = manager.apply_leg(
            &IncomingLeg {
                risk_pair: &leg.risk_pair,
                side: leg.side,
                quantity: leg.quantity,
                price: leg.reference_price,
                origin_trade_id,
                origin_leg_index: leg.leg_index,
                origin_pair: &leg.origin_pair,
            },
            timestamp,
        )?;

        for lot_match in &outcome.matches {
            records.push(lot_match_record(timestamp, origin_trade_id, lot_match));
        }
        if let Some(lot) = &outcome.opened {
            records.push(lot_created_record(timestamp, lot));
        }
    }

    Ok(state.with_lot_manager(manager))
}

fn reject(
    state: EngineState,
    timestamp: DateTime<Utc>,
    event_type: EventType,
    reason: String,
) -> HandlerOutput {
    let record = OutputRecord::new(timestamp, RecordType::ValidationError)
        .with_str("event_type", event_type.as_str())
        .with_str("reason", reason);
    (state.increment_event_count(), vec![record])
}

fn lot_tracking_error(
    timestamp: DateTime<Utc>,
    origin_trade_id: &str,
    currency_pair: &str,
    reason: &str,
    detail: &str,
) -> OutputRecord {
    OutputRecord::new(timestamp, RecordType::LotTrackingError)
        .with_str("trade_id", origin_trade_id)
        .with_str("currency_pair", currency_pair)
        .with_str("reason", reason)
        .with_str("detail", detail)
}

fn lot_created_record(timestamp: DateTime<Utc>, lot: &Lot) -> OutputRecord {
    OutputRecord::new(timestamp, RecordType::LotCreated)
        .with_value("lot_id", Value::from(lot.lot_id))
        .with_str("risk_pair", &lot.risk_pair)
        .with_str("side", lot.side.as_str())
        .with_decimal("quantity", lot.quantity)
        .with_decimal("trade_price", lot.trade_price)
        .with_str("origin_trade_id", &lot.origin_trade_id)
        .with_value("origin_leg_index", Value::from(lot.origin_leg_index))
        .with_str("origin_pair", &lot.origin_pair)
}

fn lot_match_record(
    timestamp: DateTime<Utc>,
    origin_trade_id: &str,
    lot_match: &LotMatch,
) -> OutputRecord {
    OutputRecord::new(timestamp, RecordType::LotMatch)
        .with_value("matched_lot_id", Value::from(lot_match.matched_lot_id))
        .with_str("risk_pair", &lot_match.risk_pair)
        .with_decimal("matched_quantity", lot_match.matched_quantity)
        .with_decimal("realized_pnl", lot_match.realized_pnl)
        .with_decimal("close_price", lot_match.close_price)
        .with_str("origin_trade_id", origin_trade_id)
}

fn decimal_map(map: &BTreeMap<String, Decimal>) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), Value::String(value.to_string())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fxdesk_lots::LotManager;
    use fxdesk_types::Side;
    use rust_decimal_macros::dec;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn lot_state() -> EngineState {
        let config = LotTrackingConfig {
            enabled: true,
            risk_pairs: vec!["EUR/USD".to_string(), "GBP/USD".to_string()],
            trade_pairs: vec![
                "EUR/USD".to_string(),
                "GBP/USD".to_string(),
                "EUR/GBP".to_string(),
            ],
            hedge_pairs: vec!["EUR/USD".to_string()],
            ..LotTrackingConfig::default()
        };
        EngineState::new("USD").with_lot_manager(LotManager::new(config))
    }

    fn market_update(pair: &str, bid: Decimal, ask: Decimal, mid: Decimal) -> MarketUpdate {
        MarketUpdate {
            currency_pair: pair.to_string(),
            bid,
            ask,
            mid,
        }
    }

    fn client_trade(pair: &str, side: Side, notional: Decimal, price: Decimal) -> ClientTrade {
        ClientTrade {
            currency_pair: pair.to_string(),
            side,
            notional,
            price,
            client_id: "CLIENT1".to_string(),
            trade_id: "T001".to_string(),
        }
    }

    #[test]
    fn test_market_update_stores_rate_and_emits_record() {
        let update = market_update("EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000));
        let (state, records) =
            handle_market_update(EngineState::new("USD"), ts(9), &update).unwrap();

        let rate = state.market_rate("EUR/USD").unwrap();
        assert_eq!(rate.mid, dec!(1.1000));
        assert_eq!(state.event_count(), 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type, RecordType::MarketUpdate);
    }

    #[test]
    fn test_market_update_crossed_quote_is_rejected() {
        let update = market_update("EUR/USD", dec!(1.1010), dec!(1.1005), dec!(1.1000));
        let (state, records) =
            handle_market_update(EngineState::new("USD"), ts(9), &update).unwrap();

        assert!(state.market_rate("EUR/USD").is_none());
        assert_eq!(state.event_count(), 1);
        assert_eq!(records[0].record_type, RecordType::ValidationError);
        assert_eq!(records[0].data["event_type"], "market_update");
    }

    #[test]
    fn test_client_trade_updates_cash_positions_and_lots() {
        let (state, _) = handle_market_update(
            lot_state(),
            ts(9),
            &market_update("EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        )
        .unwrap();

        let trade = client_trade("EUR/USD", Side::Buy, dec!(1000000), dec!(1.1000));
        let (state, records) = handle_client_trade(state, ts(10), &trade).unwrap();

        assert_eq!(state.cash_balance("EUR"), dec!(-1000000));
        assert_eq!(state.cash_balance("USD"), dec!(1100000.0000));
        assert_eq!(state.position("EUR/USD"), dec!(-1000000));

        let manager = state.lot_manager().unwrap();
        assert_eq!(manager.net_position("EUR/USD"), dec!(-1000000));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, RecordType::ClientTrade);
        assert_eq!(records[1].record_type, RecordType::LotCreated);
        assert_eq!(records[1].data["side"], "SELL");
    }

    #[test]
    fn test_client_trade_invalid_notional_leaves_state_unchanged() {
        let trade = client_trade("EUR/USD", Side::Buy, dec!(-100), dec!(1.1000));
        let (state, records) =
            handle_client_trade(EngineState::new("USD"), ts(10), &trade).unwrap();

        assert!(state.cash_balances().is_empty());
        assert_eq!(state.event_count(), 1);
        assert_eq!(records[0].record_type, RecordType::ValidationError);
    }

    #[test]
    fn test_client_trade_missing_rate_keeps_accounting() {
        let (state, _) = handle_market_update(
            lot_state(),
            ts(9),
            &market_update("EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        )
        .unwrap();

        // EUR/GBP cross needs GBP/USD which has no quote
        let trade = client_trade("EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500));
        let (state, records) = handle_client_trade(state, ts(10), &trade).unwrap();

        assert_eq!(state.cash_balance("EUR"), dec!(-1000000));
        assert_eq!(state.cash_balance("GBP"), dec!(850000.0000));
        assert_eq!(state.position("EUR/GBP"), dec!(-1000000));

        let manager = state.lot_manager().unwrap();
        assert_eq!(manager.open_lot_count(), 0);

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].record_type, RecordType::LotTrackingError);
        assert_eq!(records[1].data["reason"], "missing_rate");
    }

    #[test]
    fn test_config_update_switches_reporting_currency() {
        let update = ConfigUpdate {
            config_key: "reporting_currency".to_string(),
            config_value: "EUR".to_string(),
        };
        let (state, records) =
            handle_config_update(EngineState::new("USD"), ts(9), &update).unwrap();

        assert_eq!(state.reporting_currency(), "EUR");
        assert_eq!(records[0].record_type, RecordType::ConfigUpdate);
    }

    #[test]
    fn test_config_update_stores_free_form_keys() {
        let update = ConfigUpdate {
            config_key: "hedge_threshold".to_string(),
            config_value: "5000000".to_string(),
        };
        let (state, _) = handle_config_update(EngineState::new("USD"), ts(9), &update).unwrap();

        assert_eq!(state.reporting_currency(), "USD");
        assert_eq!(state.config_value("hedge_threshold"), Some("5000000"));
    }

    #[test]
    fn test_hedge_order_is_log_only() {
        let order = HedgeOrder {
            order_id: "H001".to_string(),
            currency_pair: "EUR/USD".to_string(),
            side: Side::Buy,
            notional: dec!(500000),
            limit_price: None,
        };
        let (state, records) = handle_hedge_order(EngineState::new("USD"), ts(9), &order).unwrap();

        assert!(state.cash_balances().is_empty());
        assert_eq!(state.event_count(), 1);
        assert_eq!(records[0].record_type, RecordType::HedgeOrder);
        assert_eq!(records[0].data["limit_price"], Value::Null);
    }

    #[test]
    fn test_hedge_fill_applies_accounting_slippage_and_lots() {
        let fill = HedgeFill {
            order_id: "H001".to_string(),
            currency_pair: "EUR/USD".to_string(),
            side: Side::Buy,
            notional: dec!(500000),
            fill_price: dec!(1.1000),
            slippage: dec!(25),
        };
        let (state, records) = handle_hedge_fill(lot_state(), ts(9), &fill).unwrap();

        assert_eq!(state.cash_balance("EUR"), dec!(-500000));
        // 550000 quote in, minus 25 slippage
        assert_eq!(state.cash_balance("USD"), dec!(549975.0000));
        assert_eq!(state.position("EUR/USD"), dec!(-500000));

        let manager = state.lot_manager().unwrap();
        assert_eq!(manager.net_position("EUR/USD"), dec!(-500000));

        assert_eq!(records[0].record_type, RecordType::HedgeFill);
        assert_eq!(records[1].record_type, RecordType::LotCreated);
    }

    #[test]
    fn test_hedge_fill_outside_hedge_pairs_skips_lots() {
        let fill = HedgeFill {
            order_id: "H002".to_string(),
            currency_pair: "GBP/USD".to_string(),
            side: Side::Sell,
            notional: dec!(100000),
            fill_price: dec!(1.2900),
            slippage: Decimal::ZERO,
        };
        let (state, records) = handle_hedge_fill(lot_state(), ts(9), &fill).unwrap();

        assert_eq!(state.position("GBP/USD"), dec!(100000));
        assert_eq!(state.lot_manager().unwrap().open_lot_count(), 0);
        assert_eq!(records[1].record_type, RecordType::LotTrackingError);
        assert_eq!(records[1].data["reason"], "decomposition_error");
    }

    #[test]
    fn test_clock_tick_snapshots_derived_values() {
        let (state, _) = handle_market_update(
            lot_state(),
            ts(9),
            &market_update("EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        )
        .unwrap();
        let trade = client_trade("EUR/USD", Side::Buy, dec!(1000000), dec!(1.1000));
        let (state, _) = handle_client_trade(state, ts(10), &trade).unwrap();

        let tick = ClockTick {
            tick_label: "EOD".to_string(),
        };
        let (state, records) = handle_clock_tick(state, ts(11), &tick).unwrap();

        assert_eq!(state.event_count(), 3);
        let snapshot = &records[0];
        assert_eq!(snapshot.record_type, RecordType::Snapshot);
        assert_eq!(snapshot.data["tick_label"], "EOD");
        // -1M EUR at 1.1000 exactly offsets +1.1M USD
        assert_eq!(snapshot.data["exposures"]["EUR"], "-1100000.0000");
        assert_eq!(snapshot.data["exposures"]["USD"], "1100000.0000");
        assert_eq!(snapshot.data["total_equity"], "0.0000");
        assert_eq!(snapshot.data["net_positions"]["EUR/USD"], "-1000000");
        assert_eq!(snapshot.data["open_lots"], 1);
    }

    #[test]
    fn test_clock_tick_is_idempotent_on_derived_values() {
        let (state, _) = handle_market_update(
            lot_state(),
            ts(9),
            &market_update("EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        )
        .unwrap();

        let tick = ClockTick {
            tick_label: "T1".to_string(),
        };
        let (state, first) = handle_clock_tick(state, ts(10), &tick).unwrap();
        let tick2 = ClockTick {
            tick_label: "T2".to_string(),
        };
        let (_, second) = handle_clock_tick(state, ts(11), &tick2).unwrap();

        let mut a = first[0].data.clone();
        let mut b = second[0].data.clone();
        for ignored in ["tick_label", "event_count"] {
            a.remove(ignored);
            b.remove(ignored);
        }
        assert_eq!(a, b);
    }
}
