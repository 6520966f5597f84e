//! Deterministic sample-event generator.
//!
//! Writes market updates, client trades, and clock ticks in the input
//! schemas under a target directory (first CLI argument, default
//! `sample_data`). All randomness comes from a fixed ChaCha8 seed, so
//! regenerating produces byte-identical fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parquet::arrow::arrow_writer::ArrowWriter;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

const RNG_SEED: u64 = 42;
const NUM_TICKS: usize = 1000;
const NUM_TRADES: usize = 100;
const NUM_SNAPSHOT_HOURS: i64 = 8;
const PAIRS: [&str; 4] = ["EUR/USD", "GBP/USD", "USD/JPY", "AUD/USD"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("sample_data"), PathBuf::from);
    fs::create_dir_all(&out_dir)?;

    let base_time = Utc
        .with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .ok_or("invalid base timestamp")?;
    let mut rng = ChaCha8Rng::seed_from_u64(RNG_SEED);
    let mut sequence_id: i64 = 0;

    write_market_updates(&out_dir, base_time, &mut rng, &mut sequence_id)?;
    write_client_trades(&out_dir, base_time, &mut rng, &mut sequence_id)?;
    write_clock_ticks(&out_dir, base_time, &mut sequence_id)?;

    println!("sample data written to {}", out_dir.display());
    Ok(())
}

fn base_rate(pair: &str) -> Decimal {
    match pair {
        "EUR/USD" => Decimal::new(11000, 4),  // 1.1000
        "GBP/USD" => Decimal::new(12700, 4),  // 1.2700
        "USD/JPY" => Decimal::new(1100000, 4), // 110.0000
        _ => Decimal::new(7300, 4),           // 0.7300
    }
}

fn write_market_updates(
    out_dir: &Path,
    base_time: DateTime<Utc>,
    rng: &mut ChaCha8Rng,
    sequence_id: &mut i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut timestamps = Vec::with_capacity(NUM_TICKS);
    let mut sequence_ids = Vec::with_capacity(NUM_TICKS);
    let mut pairs = Vec::with_capacity(NUM_TICKS);
    let mut bids = Vec::with_capacity(NUM_TICKS);
    let mut asks = Vec::with_capacity(NUM_TICKS);
    let mut mids = Vec::with_capacity(NUM_TICKS);

    // half a pip each side of mid
    let half_spread = Decimal::new(5, 5);

    for i in 0..NUM_TICKS {
        let timestamp = base_time + Duration::seconds(i as i64 * 10);
        let pair = PAIRS[rng.gen_range(0..PAIRS.len())];
        let jitter_pips: i64 = rng.gen_range(-25..=25);
        let mid = base_rate(pair) + Decimal::new(jitter_pips, 4);

        timestamps.push(timestamp.timestamp_micros());
        sequence_ids.push(*sequence_id);
        pairs.push(pair.to_string());
        bids.push((mid - half_spread).to_string());
        asks.push((mid + half_spread).to_string());
        mids.push(mid.to_string());
        *sequence_id += 1;
    }

    let fields = vec![
        timestamp_field(),
        Field::new("sequence_id", DataType::Int64, false),
        Field::new("currency_pair", DataType::Utf8, false),
        Field::new("bid", DataType::Utf8, false),
        Field::new("ask", DataType::Utf8, false),
        Field::new("mid", DataType::Utf8, false),
    ];
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        Arc::new(Int64Array::from(sequence_ids)),
        Arc::new(StringArray::from(pairs)),
        Arc::new(StringArray::from(bids)),
        Arc::new(StringArray::from(asks)),
        Arc::new(StringArray::from(mids)),
    ];
    write_parquet(&out_dir.join("market_updates.parquet"), fields, columns)
}

fn write_client_trades(
    out_dir: &Path,
    base_time: DateTime<Utc>,
    rng: &mut ChaCha8Rng,
    sequence_id: &mut i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut timestamps = Vec::with_capacity(NUM_TRADES);
    let mut sequence_ids = Vec::with_capacity(NUM_TRADES);
    let mut pairs = Vec::with_capacity(NUM_TRADES);
    let mut sides = Vec::with_capacity(NUM_TRADES);
    let mut notionals = Vec::with_capacity(NUM_TRADES);
    let mut prices = Vec::with_capacity(NUM_TRADES);
    let mut client_ids = Vec::with_capacity(NUM_TRADES);
    let mut trade_ids = Vec::with_capacity(NUM_TRADES);

    for i in 0..NUM_TRADES {
        let offset = rng.gen_range(0..(NUM_TICKS as i64 * 10));
        let timestamp = base_time + Duration::seconds(offset);
        let pair = PAIRS[rng.gen_range(0..PAIRS.len())];
        let side = if rng.gen_bool(0.5) { "BUY" } else { "SELL" };
        let notional = Decimal::from(rng.gen_range(100..=10_000) * 1_000);
        let jitter_pips: i64 = rng.gen_range(-50..=50);
        let price = base_rate(pair) + Decimal::new(jitter_pips, 4);

        timestamps.push(timestamp.timestamp_micros());
        sequence_ids.push(*sequence_id);
        pairs.push(pair.to_string());
        sides.push(side.to_string());
        notionals.push(notional.to_string());
        prices.push(price.to_string());
        client_ids.push(format!("CLIENT_{}", rng.gen_range(1..=20)));
        trade_ids.push(format!("TRADE_{:06}", i + 1));
        *sequence_id += 1;
    }

    let fields = vec![
        timestamp_field(),
        Field::new("sequence_id", DataType::Int64, false),
        Field::new("currency_pair", DataType::Utf8, false),
        Field::new("side", DataType::Utf8, false),
        Field::new("notional", DataType::Utf8, false),
        Field::new("price", DataType::Utf8, false),
        Field::new("client_id", DataType::Utf8, false),
        Field::new("trade_id", DataType::Utf8, false),
    ];
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        Arc::new(Int64Array::from(sequence_ids)),
        Arc::new(StringArray::from(pairs)),
        Arc::new(StringArray::from(sides)),
        Arc::new(StringArray::from(notionals)),
        Arc::new(StringArray::from(prices)),
        Arc::new(StringArray::from(client_ids)),
        Arc::new(StringArray::from(trade_ids)),
    ];
    write_parquet(&out_dir.join("client_trades.parquet"), fields, columns)
}

fn write_clock_ticks(
    out_dir: &Path,
    base_time: DateTime<Utc>,
    sequence_id: &mut i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut timestamps = Vec::new();
    let mut sequence_ids = Vec::new();
    let mut labels = Vec::new();

    for hour in 0..NUM_SNAPSHOT_HOURS {
        let timestamp = base_time + Duration::hours(hour);
        timestamps.push(timestamp.timestamp_micros());
        sequence_ids.push(*sequence_id);
        labels.push(format!("T+{hour}H"));
        *sequence_id += 1;
    }

    let fields = vec![
        timestamp_field(),
        Field::new("sequence_id", DataType::Int64, false),
        Field::new("tick_label", DataType::Utf8, false),
    ];
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        Arc::new(Int64Array::from(sequence_ids)),
        Arc::new(StringArray::from(labels)),
    ];
    write_parquet(&out_dir.join("clock_ticks.parquet"), fields, columns)
}

fn timestamp_field() -> Field {
    Field::new(
        "timestamp",
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

fn write_parquet(
    path: &Path,
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let file = fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
