//! End-to-end simulation tests.
//!
//! Covers the accounting scenarios, cross decomposition, FIFO matching,
//! replay consistency, and the determinism guarantees (identical output
//! for identical input, arrival-order and source-partition invariance).

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fxdesk_engine::{EngineError, EventProcessor, MemorySink, VecSource, runner};
use fxdesk_types::{
    ClientTrade, ClockTick, Event, EventPayload, HedgeFill, LotTrackingConfig, MarketUpdate,
    OutputRecord, RecordType, Side, SimConfig,
};

fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}

fn market(sequence_id: u64, hour: u32, pair: &str, bid: Decimal, ask: Decimal, mid: Decimal) -> Event {
    Event {
        timestamp: ts(hour, 0),
        sequence_id,
        payload: EventPayload::MarketUpdate(MarketUpdate {
            currency_pair: pair.to_string(),
            bid,
            ask,
            mid,
        }),
    }
}

fn trade(
    sequence_id: u64,
    hour: u32,
    pair: &str,
    side: Side,
    notional: Decimal,
    price: Decimal,
) -> Event {
    Event {
        timestamp: ts(hour, 0),
        sequence_id,
        payload: EventPayload::ClientTrade(ClientTrade {
            currency_pair: pair.to_string(),
            side,
            notional,
            price,
            client_id: "CLIENT1".to_string(),
            trade_id: format!("T{sequence_id:03}"),
        }),
    }
}

fn tick(sequence_id: u64, hour: u32, label: &str) -> Event {
    Event {
        timestamp: ts(hour, 0),
        sequence_id,
        payload: EventPayload::ClockTick(ClockTick {
            tick_label: label.to_string(),
        }),
    }
}

fn lot_config() -> SimConfig {
    SimConfig {
        reporting_currency: "USD".to_string(),
        lot_tracking: LotTrackingConfig {
            enabled: true,
            risk_pairs: vec!["EUR/USD".to_string(), "GBP/USD".to_string()],
            trade_pairs: vec![
                "EUR/USD".to_string(),
                "GBP/USD".to_string(),
                "EUR/GBP".to_string(),
            ],
            hedge_pairs: vec!["EUR/USD".to_string()],
            ..LotTrackingConfig::default()
        },
        inputs: None,
        outputs: None,
    }
}

fn records_of(records: &[OutputRecord], record_type: RecordType) -> Vec<&OutputRecord> {
    records
        .iter()
        .filter(|r| r.record_type == record_type)
        .collect()
}

fn serialize_records(records: &[OutputRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| serde_json::to_string(r).expect("record serializes"))
        .collect()
}

#[test]
fn test_single_direct_trade() {
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        trade(2, 10, "EUR/USD", Side::Buy, dec!(1000000), dec!(1.1000)),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    assert_eq!(run.final_state.cash_balance("EUR"), dec!(-1000000));
    assert_eq!(run.final_state.cash_balance("USD"), dec!(1100000.0000));
    assert_eq!(run.final_state.position("EUR/USD"), dec!(-1000000));

    let manager = run.final_state.lot_manager().unwrap();
    assert_eq!(manager.net_position("EUR/USD"), dec!(-1000000));
    let queue = manager.queue("EUR/USD").unwrap();
    assert_eq!(queue.open_lots().len(), 1);
    let lot = &queue.open_lots()[0];
    assert_eq!(lot.side, Side::Sell);
    assert_eq!(lot.quantity, dec!(1000000));
    assert_eq!(lot.trade_price, dec!(1.1000));

    let created = records_of(&run.records, RecordType::LotCreated);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].data["risk_pair"], "EUR/USD");
    assert_eq!(created[0].data["side"], "SELL");
}

#[test]
fn test_cross_decomposition() {
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        market(2, 9, "GBP/USD", dec!(1.2936), dec!(1.2946), dec!(1.2941)),
        trade(3, 10, "EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500)),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    let manager = run.final_state.lot_manager().unwrap();
    assert_eq!(manager.net_position("EUR/USD"), dec!(-1000000));
    assert_eq!(manager.net_position("GBP/USD"), dec!(850000));

    let eur_lot = &manager.queue("EUR/USD").unwrap().open_lots()[0];
    assert_eq!(eur_lot.side, Side::Sell);
    assert_eq!(eur_lot.quantity, dec!(1000000));
    assert_eq!(eur_lot.trade_price, dec!(1.1000));
    assert_eq!(eur_lot.origin_pair, "EUR/GBP");

    let gbp_lot = &manager.queue("GBP/USD").unwrap().open_lots()[0];
    assert_eq!(gbp_lot.side, Side::Buy);
    assert_eq!(gbp_lot.quantity, dec!(850000));
    assert_eq!(gbp_lot.trade_price, dec!(1.2941));

    assert_eq!(records_of(&run.records, RecordType::LotCreated).len(), 2);
}

#[test]
fn test_fifo_match_with_profit() {
    // client SELL opens a desk BUY lot at 1.1000; the later client BUY at
    // 1.1050 is a desk SELL that matches it
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        trade(2, 10, "EUR/USD", Side::Sell, dec!(500000), dec!(1.1000)),
        market(3, 11, "EUR/USD", dec!(1.1045), dec!(1.1055), dec!(1.1050)),
        trade(4, 12, "EUR/USD", Side::Buy, dec!(500000), dec!(1.1050)),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    let matches = records_of(&run.records, RecordType::LotMatch);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].data["matched_quantity"], "500000");
    assert_eq!(matches[0].data["realized_pnl"], "2500.0000");

    let manager = run.final_state.lot_manager().unwrap();
    let queue = manager.queue("EUR/USD").unwrap();
    assert!(queue.open_lots().is_empty());
    assert_eq!(queue.closed_lots().len(), 1);
    assert_eq!(manager.realized_pnl(), dec!(2500.0000));
}

#[test]
fn test_partial_match_then_flip() {
    // desk SELL 300k at 1.3000, then desk BUY 500k at 1.2900
    let events = vec![
        market(1, 9, "GBP/USD", dec!(1.2995), dec!(1.3005), dec!(1.3000)),
        trade(2, 10, "GBP/USD", Side::Buy, dec!(300000), dec!(1.3000)),
        trade(3, 11, "GBP/USD", Side::Sell, dec!(500000), dec!(1.2900)),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    let matches = records_of(&run.records, RecordType::LotMatch);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].data["matched_quantity"], "300000");
    assert_eq!(matches[0].data["realized_pnl"], "3000.0000");

    let manager = run.final_state.lot_manager().unwrap();
    let queue = manager.queue("GBP/USD").unwrap();
    assert_eq!(queue.open_lots().len(), 1);
    let flipped = &queue.open_lots()[0];
    assert_eq!(flipped.side, Side::Buy);
    assert_eq!(flipped.quantity, dec!(200000));
    assert_eq!(flipped.trade_price, dec!(1.2900));
    assert_eq!(manager.net_position("GBP/USD"), dec!(200000));
}

#[test]
fn test_missing_rate_on_cross() {
    // only EUR/USD is quoted; the GBP/USD leg cannot be priced
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        trade(2, 10, "EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500)),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    // raw accounting still applies
    assert_eq!(run.final_state.cash_balance("EUR"), dec!(-1000000));
    assert_eq!(run.final_state.cash_balance("GBP"), dec!(850000.0000));
    assert_eq!(run.final_state.position("EUR/GBP"), dec!(-1000000));

    let errors = records_of(&run.records, RecordType::LotTrackingError);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].data["reason"], "missing_rate");
    assert!(
        errors[0].data["detail"]
            .as_str()
            .unwrap()
            .contains("GBP/USD")
    );

    assert!(records_of(&run.records, RecordType::LotCreated).is_empty());
    assert_eq!(run.final_state.lot_manager().unwrap().open_lot_count(), 0);
}

#[test]
fn test_cross_round_trip_closes_flat() {
    // reversing a cross immediately at unchanged mids realizes zero
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        market(2, 9, "GBP/USD", dec!(1.2936), dec!(1.2946), dec!(1.2941)),
        trade(3, 10, "EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500)),
        trade(4, 11, "EUR/GBP", Side::Sell, dec!(1000000), dec!(0.8500)),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    let manager = run.final_state.lot_manager().unwrap();
    assert_eq!(manager.open_lot_count(), 0);
    assert_eq!(manager.closed_lot_count(), 2);
    assert_eq!(manager.net_position("EUR/USD"), Decimal::ZERO);
    assert_eq!(manager.net_position("GBP/USD"), Decimal::ZERO);
    assert_eq!(manager.realized_pnl(), Decimal::ZERO);
}

#[test]
fn test_total_realized_pnl_equals_sum_of_match_records() {
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        trade(2, 10, "EUR/USD", Side::Sell, dec!(500000), dec!(1.1000)),
        trade(3, 11, "EUR/USD", Side::Buy, dec!(200000), dec!(1.1050)),
        trade(4, 12, "EUR/USD", Side::Buy, dec!(400000), dec!(1.0980)),
        market(5, 13, "GBP/USD", dec!(1.2995), dec!(1.3005), dec!(1.3000)),
        trade(6, 14, "GBP/USD", Side::Buy, dec!(300000), dec!(1.3000)),
        trade(7, 15, "GBP/USD", Side::Sell, dec!(100000), dec!(1.2950)),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    let from_records: Decimal = records_of(&run.records, RecordType::LotMatch)
        .iter()
        .map(|r| {
            r.data["realized_pnl"]
                .as_str()
                .expect("decimal string")
                .parse::<Decimal>()
                .expect("parses")
        })
        .sum();

    let manager = run.final_state.lot_manager().unwrap();
    assert_eq!(manager.realized_pnl(), from_records);
    assert!(!from_records.is_zero());
}

#[test]
fn test_replay_of_trades_reproduces_accounting() {
    // re-applying only the trade-shaped events yields identical cash and
    // positions
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        trade(2, 10, "EUR/USD", Side::Buy, dec!(1000000), dec!(1.1000)),
        tick(3, 11, "MIDDAY"),
        Event {
            timestamp: ts(12, 0),
            sequence_id: 4,
            payload: EventPayload::HedgeFill(HedgeFill {
                order_id: "H001".to_string(),
                currency_pair: "EUR/USD".to_string(),
                side: Side::Sell,
                notional: dec!(400000),
                fill_price: dec!(1.1010),
                slippage: Decimal::ZERO,
            }),
        },
        tick(5, 13, "EOD"),
    ];
    let run = runner::run_events(&lot_config(), events.clone()).unwrap();

    let mut replayed = fxdesk_portfolio::EngineState::new("USD");
    for event in &events {
        match &event.payload {
            EventPayload::ClientTrade(t) => {
                replayed = replayed
                    .apply_trade(&t.currency_pair, t.side, t.notional, t.price)
                    .unwrap();
            }
            EventPayload::HedgeFill(f) => {
                replayed = replayed
                    .apply_trade(&f.currency_pair, f.side, f.notional, f.fill_price)
                    .unwrap();
            }
            _ => {}
        }
    }

    assert_eq!(replayed.cash_balances(), run.final_state.cash_balances());
    assert_eq!(replayed.positions(), run.final_state.positions());
}

#[test]
fn test_determinism_two_runs_byte_identical() {
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        market(2, 9, "GBP/USD", dec!(1.2936), dec!(1.2946), dec!(1.2941)),
        trade(3, 10, "EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500)),
        tick(4, 11, "T1"),
        trade(5, 12, "EUR/USD", Side::Sell, dec!(250000), dec!(1.1010)),
        tick(6, 13, "EOD"),
    ];

    let first = runner::run_events(&lot_config(), events.clone()).unwrap();
    let second = runner::run_events(&lot_config(), events).unwrap();

    assert_eq!(
        serialize_records(&first.records),
        serialize_records(&second.records)
    );
    assert_eq!(
        serde_json::to_string(&first.final_state.to_json(None)).unwrap(),
        serde_json::to_string(&second.final_state.to_json(None)).unwrap()
    );
}

#[test]
fn test_arrival_order_does_not_matter() {
    let canonical = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        market(2, 9, "GBP/USD", dec!(1.2936), dec!(1.2946), dec!(1.2941)),
        trade(3, 10, "EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500)),
        trade(4, 11, "EUR/USD", Side::Sell, dec!(250000), dec!(1.1010)),
        tick(5, 12, "EOD"),
    ];

    let baseline = runner::run_events(&lot_config(), canonical.clone()).unwrap();

    // a few fixed permutations of the same events
    let mut reversed = canonical.clone();
    reversed.reverse();
    let mut rotated = canonical.clone();
    rotated.rotate_left(2);

    for permuted in [reversed, rotated] {
        let run = runner::run_events(&lot_config(), permuted).unwrap();
        assert_eq!(
            serialize_records(&baseline.records),
            serialize_records(&run.records)
        );
        assert_eq!(baseline.final_state, run.final_state);
    }
}

#[test]
fn test_source_partition_invariance() {
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        market(2, 9, "GBP/USD", dec!(1.2936), dec!(1.2946), dec!(1.2941)),
        trade(3, 10, "EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500)),
        trade(4, 11, "EUR/USD", Side::Sell, dec!(250000), dec!(1.1010)),
        tick(5, 12, "EOD"),
    ];
    let baseline = runner::run_events(&lot_config(), events.clone()).unwrap();

    // partition by parity across two sources, markets and trades mixed
    let (even, odd): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|e| e.sequence_id % 2 == 0);

    let mut processor =
        EventProcessor::new(runner::initial_state(&lot_config()).unwrap());
    let mut sink = MemorySink::new();
    processor
        .run(
            vec![
                Box::new(VecSource::new("even", even)),
                Box::new(VecSource::new("odd", odd)),
            ],
            &mut sink,
        )
        .unwrap();

    assert_eq!(
        serialize_records(&baseline.records),
        serialize_records(sink.records())
    );
    assert_eq!(&baseline.final_state, processor.state());
}

#[test]
fn test_lot_tracking_disabled_emits_no_lot_records() {
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        trade(2, 10, "EUR/USD", Side::Buy, dec!(100000), dec!(1.1000)),
        tick(3, 11, "EOD"),
    ];
    let run = runner::run_events(&SimConfig::default(), events).unwrap();

    assert!(run.final_state.lot_manager().is_none());
    assert_eq!(run.final_state.position("EUR/USD"), dec!(-100000));
    assert!(records_of(&run.records, RecordType::LotCreated).is_empty());
    assert!(records_of(&run.records, RecordType::LotMatch).is_empty());

    // snapshots omit the lot section entirely
    let snapshots = records_of(&run.records, RecordType::Snapshot);
    assert!(!snapshots[0].data.contains_key("net_positions"));
}

#[test]
fn test_hedge_fills_can_be_excluded_from_lot_tracking() {
    let mut config = lot_config();
    config.lot_tracking.track_hedge_fills = false;

    let events = vec![Event {
        timestamp: ts(9, 0),
        sequence_id: 1,
        payload: EventPayload::HedgeFill(HedgeFill {
            order_id: "H001".to_string(),
            currency_pair: "EUR/USD".to_string(),
            side: Side::Buy,
            notional: dec!(500000),
            fill_price: dec!(1.1000),
            slippage: Decimal::ZERO,
        }),
    }];
    let run = runner::run_events(&config, events).unwrap();

    // accounting applies, but no lot is opened
    assert_eq!(run.final_state.position("EUR/USD"), dec!(-500000));
    assert_eq!(run.final_state.lot_manager().unwrap().open_lot_count(), 0);
    assert!(records_of(&run.records, RecordType::LotCreated).is_empty());
}

#[test]
fn test_duplicate_ordering_key_emits_fatal_record() {
    let events = vec![
        tick(1, 9, "A"),
        tick(1, 9, "B"), // same (timestamp, sequence_id)
    ];

    let mut sink = MemorySink::new();
    let result = runner::run_events_into(&SimConfig::default(), events, &mut sink);

    assert!(matches!(result, Err(EngineError::DuplicateEventKey { .. })));
    let records = sink.into_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type, RecordType::FatalError);
}

#[test]
fn test_snapshot_reflects_cross_trade_exposures() {
    let events = vec![
        market(1, 9, "EUR/USD", dec!(1.0995), dec!(1.1005), dec!(1.1000)),
        market(2, 9, "GBP/USD", dec!(1.2936), dec!(1.2946), dec!(1.2941)),
        trade(3, 10, "EUR/GBP", Side::Buy, dec!(1000000), dec!(0.8500)),
        tick(4, 11, "EOD"),
    ];
    let run = runner::run_events(&lot_config(), events).unwrap();

    let snapshots = records_of(&run.records, RecordType::Snapshot);
    assert_eq!(snapshots.len(), 1);
    let data = &snapshots[0].data;

    // desk is short 1M EUR, long 850k GBP
    assert_eq!(data["positions"]["EUR/GBP"], "-1000000");
    assert_eq!(data["exposures"]["EUR"], "-1100000.0000");
    assert_eq!(data["net_positions"]["EUR/USD"], "-1000000");
    assert_eq!(data["net_positions"]["GBP/USD"], "850000.0000");
    assert_eq!(data["open_lots"], 2);
    assert_eq!(data["realized_pnl"], "0");
}
