//! Parquet event loading.
//!
//! One file holds one event kind. All files share the envelope columns
//! `timestamp` (microseconds, UTC) and `sequence_id` (int64); decimals are
//! carried as canonical decimal strings and parsed exactly.

use std::path::{Path, PathBuf};

use arrow::array::{Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rust_decimal::Decimal;

use fxdesk_types::{
    ClientTrade, ClockTick, ConfigUpdate, Event, EventPayload, EventType, HedgeFill, HedgeOrder,
    MarketUpdate, Side,
};

use crate::error::DataError;

/// Loads all events of one kind from a Parquet file.
pub fn load_events(path: &Path, event_type: EventType) -> Result<Vec<Event>, DataError> {
    tracing::info!(path = %path.display(), event_type = event_type.as_str(), "loading events");

    let file = std::fs::File::open(path)
        .map_err(|e| DataError::FileNotFound(path.display().to_string(), e.to_string()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    let reader = builder
        .build()
        .map_err(|e| DataError::ParseError(e.to_string()))?;

    let mut events = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| DataError::ParseError(e.to_string()))?;
        match event_type {
            EventType::ClientTrade => decode_client_trades(&batch, &mut events)?,
            EventType::MarketUpdate => decode_market_updates(&batch, &mut events)?,
            EventType::ConfigUpdate => decode_config_updates(&batch, &mut events)?,
            EventType::HedgeOrder => decode_hedge_orders(&batch, &mut events)?,
            EventType::HedgeFill => decode_hedge_fills(&batch, &mut events)?,
            EventType::ClockTick => decode_clock_ticks(&batch, &mut events)?,
        }
    }

    tracing::info!(count = events.len(), "events loaded");
    Ok(events)
}

/// Loads and concatenates heterogeneous event files. Missing files are
/// skipped with a warning; establishing the global order is the
/// processor's job.
pub fn load_and_merge(files: &[(EventType, PathBuf)]) -> Result<Vec<Event>, DataError> {
    let mut events = Vec::new();
    for (event_type, path) in files {
        if path.exists() {
            events.extend(load_events(path, *event_type)?);
        } else {
            tracing::warn!(
                event_type = event_type.as_str(),
                path = %path.display(),
                "event file not found"
            );
        }
    }
    tracing::info!(total_count = events.len(), "event files merged");
    Ok(events)
}

fn decode_client_trades(batch: &RecordBatch, out: &mut Vec<Event>) -> Result<(), DataError> {
    let timestamps = timestamp_column(batch)?;
    let sequence_ids = int64_column(batch, "sequence_id")?;
    let pairs = string_column(batch, "currency_pair")?;
    let sides = string_column(batch, "side")?;
    let notionals = string_column(batch, "notional")?;
    let prices = string_column(batch, "price")?;
    let client_ids = string_column(batch, "client_id")?;
    let trade_ids = string_column(batch, "trade_id")?;

    for row in 0..batch.num_rows() {
        let (timestamp, sequence_id) = envelope(timestamps, sequence_ids, row)?;
        out.push(Event {
            timestamp,
            sequence_id,
            payload: EventPayload::ClientTrade(ClientTrade {
                currency_pair: pairs.value(row).to_string(),
                side: parse_side(sides.value(row), row)?,
                notional: parse_decimal(notionals.value(row), "notional", row)?,
                price: parse_decimal(prices.value(row), "price", row)?,
                client_id: client_ids.value(row).to_string(),
                trade_id: trade_ids.value(row).to_string(),
            }),
        });
    }
    Ok(())
}

fn decode_market_updates(batch: &RecordBatch, out: &mut Vec<Event>) -> Result<(), DataError> {
    let timestamps = timestamp_column(batch)?;
    let sequence_ids = int64_column(batch, "sequence_id")?;
    let pairs = string_column(batch, "currency_pair")?;
    let bids = string_column(batch, "bid")?;
    let asks = string_column(batch, "ask")?;
    let mids = string_column(batch, "mid")?;

    for row in 0..batch.num_rows() {
        let (timestamp, sequence_id) = envelope(timestamps, sequence_ids, row)?;
        out.push(Event {
            timestamp,
            sequence_id,
            payload: EventPayload::MarketUpdate(MarketUpdate {
                currency_pair: pairs.value(row).to_string(),
                bid: parse_decimal(bids.value(row), "bid", row)?,
                ask: parse_decimal(asks.value(row), "ask", row)?,
                mid: parse_decimal(mids.value(row), "mid", row)?,
            }),
        });
    }
    Ok(())
}

fn decode_config_updates(batch: &RecordBatch, out: &mut Vec<Event>) -> Result<(), DataError> {
    let timestamps = timestamp_column(batch)?;
    let sequence_ids = int64_column(batch, "sequence_id")?;
    let keys = string_column(batch, "config_key")?;
    let values = string_column(batch, "config_value")?;

    for row in 0..batch.num_rows() {
        let (timestamp, sequence_id) = envelope(timestamps, sequence_ids, row)?;
        out.push(Event {
            timestamp,
            sequence_id,
            payload: EventPayload::ConfigUpdate(ConfigUpdate {
                config_key: keys.value(row).to_string(),
                config_value: values.value(row).to_string(),
            }),
        });
    }
    Ok(())
}

fn decode_hedge_orders(batch: &RecordBatch, out: &mut Vec<Event>) -> Result<(), DataError> {
    let timestamps = timestamp_column(batch)?;
    let sequence_ids = int64_column(batch, "sequence_id")?;
    let order_ids = string_column(batch, "order_id")?;
    let pairs = string_column(batch, "currency_pair")?;
    let sides = string_column(batch, "side")?;
    let notionals = string_column(batch, "notional")?;
    let limits = string_column(batch, "limit_price")?;

    for row in 0..batch.num_rows() {
        let (timestamp, sequence_id) = envelope(timestamps, sequence_ids, row)?;
        let limit_price = if limits.is_null(row) || limits.value(row).is_empty() {
            None
        } else {
            Some(parse_decimal(limits.value(row), "limit_price", row)?)
        };
        out.push(Event {
            timestamp,
            sequence_id,
            payload: EventPayload::HedgeOrder(HedgeOrder {
                order_id: order_ids.value(row).to_string(),
                currency_pair: pairs.value(row).to_string(),
                side: parse_side(sides.value(row), row)?,
                notional: parse_decimal(notionals.value(row), "notional", row)?,
                limit_price,
            }),
        });
    }
    Ok(())
}

fn decode_hedge_fills(batch: &RecordBatch, out: &mut Vec<Event>) -> Result<(), DataError> {
    let timestamps = timestamp_column(batch)?;
    let sequence_ids = int64_column(batch, "sequence_id")?;
    let order_ids = string_column(batch, "order_id")?;
    let pairs = string_column(batch, "currency_pair")?;
    let sides = string_column(batch, "side")?;
    let notionals = string_column(batch, "notional")?;
    let fill_prices = string_column(batch, "fill_price")?;
    let slippages = string_column(batch, "slippage")?;

    for row in 0..batch.num_rows() {
        let (timestamp, sequence_id) = envelope(timestamps, sequence_ids, row)?;
        let slippage = if slippages.is_null(row) {
            Decimal::ZERO
        } else {
            parse_decimal(slippages.value(row), "slippage", row)?
        };
        out.push(Event {
            timestamp,
            sequence_id,
            payload: EventPayload::HedgeFill(HedgeFill {
                order_id: order_ids.value(row).to_string(),
                currency_pair: pairs.value(row).to_string(),
                side: parse_side(sides.value(row), row)?,
                notional: parse_decimal(notionals.value(row), "notional", row)?,
                fill_price: parse_decimal(fill_prices.value(row), "fill_price", row)?,
                slippage,
            }),
        });
    }
    Ok(())
}

fn decode_clock_ticks(batch: &RecordBatch, out: &mut Vec<Event>) -> Result<(), DataError> {
    let timestamps = timestamp_column(batch)?;
    let sequence_ids = int64_column(batch, "sequence_id")?;
    let labels = string_column(batch, "tick_label")?;

    for row in 0..batch.num_rows() {
        let (timestamp, sequence_id) = envelope(timestamps, sequence_ids, row)?;
        out.push(Event {
            timestamp,
            sequence_id,
            payload: EventPayload::ClockTick(ClockTick {
                tick_label: labels.value(row).to_string(),
            }),
        });
    }
    Ok(())
}

fn envelope(
    timestamps: &TimestampMicrosecondArray,
    sequence_ids: &Int64Array,
    row: usize,
) -> Result<(DateTime<Utc>, u64), DataError> {
    let timestamp = DateTime::from_timestamp_micros(timestamps.value(row))
        .ok_or_else(|| DataError::CorruptData(format!("timestamp out of range at row {row}")))?;
    let sequence_id = u64::try_from(sequence_ids.value(row))
        .map_err(|_| DataError::CorruptData(format!("negative sequence_id at row {row}")))?;
    Ok((timestamp, sequence_id))
}

fn parse_side(raw: &str, row: usize) -> Result<Side, DataError> {
    raw.parse::<Side>()
        .map_err(|_| DataError::CorruptData(format!("invalid side '{raw}' at row {row}")))
}

fn parse_decimal(raw: &str, column: &str, row: usize) -> Result<Decimal, DataError> {
    raw.parse::<Decimal>().map_err(|_| {
        DataError::CorruptData(format!("invalid decimal '{raw}' in {column} at row {row}"))
    })
}

fn timestamp_column(batch: &RecordBatch) -> Result<&TimestampMicrosecondArray, DataError> {
    let col = batch
        .column_by_name("timestamp")
        .ok_or_else(|| DataError::MissingColumn("timestamp".to_string()))?;
    col.as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or_else(|| DataError::InvalidColumnType("timestamp".to_string()))
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array, DataError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
    col.as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DataError::InvalidColumnType(name.to_string()))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, DataError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
    col.as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DataError::InvalidColumnType(name.to_string()))
}
