//! Output writers: JSONL audit log, snapshot Parquet series, final-state
//! JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use serde_json::Value;

use fxdesk_types::{OutputRecord, RecordType};

use crate::error::DataError;

/// Writes all records to an append-only JSONL audit log, one JSON object
/// per line, data keys sorted.
pub fn write_audit_jsonl(records: &[OutputRecord], path: &Path) -> Result<(), DataError> {
    tracing::info!(path = %path.display(), count = records.len(), "writing audit log");
    ensure_parent_dir(path)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| DataError::ParseError(e.to_string()))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `snapshot` records as a Parquet time series for analytics.
/// Nested maps are carried as JSON-encoded strings.
pub fn write_snapshots_parquet(records: &[OutputRecord], path: &Path) -> Result<(), DataError> {
    let snapshots: Vec<&OutputRecord> = records
        .iter()
        .filter(|r| r.record_type == RecordType::Snapshot)
        .collect();

    if snapshots.is_empty() {
        tracing::warn!("no snapshots to write");
        return Ok(());
    }

    tracing::info!(path = %path.display(), count = snapshots.len(), "writing snapshots");
    ensure_parent_dir(path)?;

    let timestamps: Vec<i64> = snapshots.iter().map(|s| s.timestamp.timestamp_micros()).collect();
    let tick_labels: Vec<&str> = snapshots.iter().map(|s| str_field(s, "tick_label")).collect();
    let event_counts: Vec<i64> = snapshots
        .iter()
        .map(|s| s.data.get("event_count").and_then(Value::as_i64).unwrap_or(0))
        .collect();
    let reporting: Vec<&str> = snapshots
        .iter()
        .map(|s| str_field(s, "reporting_currency"))
        .collect();
    let total_equity: Vec<&str> = snapshots.iter().map(|s| str_field(s, "total_equity")).collect();
    let cash: Vec<String> = json_field(&snapshots, "cash_balances")?;
    let positions: Vec<String> = json_field(&snapshots, "positions")?;
    let exposures: Vec<String> = json_field(&snapshots, "exposures")?;

    let fields = vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("tick_label", DataType::Utf8, false),
        Field::new("event_count", DataType::Int64, false),
        Field::new("reporting_currency", DataType::Utf8, false),
        Field::new("total_equity", DataType::Utf8, false),
        Field::new("cash_balances", DataType::Utf8, false),
        Field::new("positions", DataType::Utf8, false),
        Field::new("exposures", DataType::Utf8, false),
    ];
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
        Arc::new(StringArray::from(tick_labels)),
        Arc::new(Int64Array::from(event_counts)),
        Arc::new(StringArray::from(reporting)),
        Arc::new(StringArray::from(total_equity)),
        Arc::new(StringArray::from(cash)),
        Arc::new(StringArray::from(positions)),
        Arc::new(StringArray::from(exposures)),
    ];

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    let file = File::create(path)?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).map_err(|e| DataError::ParseError(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    writer
        .close()
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    Ok(())
}

/// Writes the final engine state as pretty-printed JSON.
pub fn write_final_state_json(state: &Value, path: &Path) -> Result<(), DataError> {
    tracing::info!(path = %path.display(), "writing final state");
    ensure_parent_dir(path)?;

    let rendered =
        serde_json::to_string_pretty(state).map_err(|e| DataError::ParseError(e.to_string()))?;
    let mut file = File::create(path)?;
    file.write_all(rendered.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn str_field<'a>(record: &'a OutputRecord, key: &str) -> &'a str {
    record.data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn json_field(snapshots: &[&OutputRecord], key: &str) -> Result<Vec<String>, DataError> {
    snapshots
        .iter()
        .map(|s| {
            let value = s.data.get(key).cloned().unwrap_or(Value::Null);
            serde_json::to_string(&value).map_err(|e| DataError::ParseError(e.to_string()))
        })
        .collect()
}
