//! Batch simulation entry point.
//!
//! Usage: `run_sim <config.json>`. Loads the configured Parquet event
//! files, runs the processor, and writes the audit log, snapshot series,
//! and final state.

use std::path::{Path, PathBuf};

use fxdesk_data::{load_and_merge, write_audit_jsonl, write_final_state_json, write_snapshots_parquet};
use fxdesk_engine::runner;
use fxdesk_types::{EventType, SimConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let config_path = std::env::args()
        .nth(1)
        .ok_or("usage: run_sim <config.json>")?;
    let config_json = std::fs::read_to_string(&config_path)?;
    let config: SimConfig = serde_json::from_str(&config_json)?;

    tracing::info!(config_file = %config_path, "simulation started");

    let inputs = config
        .inputs
        .as_ref()
        .ok_or("config.inputs is required for the run binary")?;
    let files: Vec<(EventType, PathBuf)> = inputs
        .files
        .iter()
        .map(|(event_type, file)| (*event_type, Path::new(&inputs.directory).join(file)))
        .collect();

    let events = load_and_merge(&files)?;
    if events.is_empty() {
        tracing::error!("no events loaded");
        return Err("no events loaded".into());
    }

    let last_timestamp = events.iter().map(|e| e.timestamp).max();
    let run = runner::run_events(&config, events)?;

    if let Some(outputs) = &config.outputs {
        let out_dir = Path::new(&outputs.directory);
        std::fs::create_dir_all(out_dir)?;

        write_audit_jsonl(&run.records, &out_dir.join(&outputs.audit_log))?;
        write_snapshots_parquet(&run.records, &out_dir.join(&outputs.snapshots))?;
        write_final_state_json(
            &run.final_state.to_json(last_timestamp),
            &out_dir.join(&outputs.final_state),
        )?;
        tracing::info!(output_dir = %out_dir.display(), "outputs written");
    }

    tracing::info!(
        events_processed = run.final_state.event_count(),
        records_emitted = run.records.len(),
        "simulation completed"
    );

    println!("\n=== Simulation Summary ===");
    println!("Events processed: {}", run.final_state.event_count());
    println!(
        "Reporting currency: {}",
        run.final_state.reporting_currency()
    );
    println!("\nCash balances:");
    for (currency, balance) in run.final_state.cash_balances() {
        println!("  {currency}: {balance}");
    }
    println!("\nPositions:");
    for (pair, position) in run.final_state.positions() {
        println!("  {pair}: {position}");
    }
    if let Some(manager) = run.final_state.lot_manager() {
        println!("\nLot tracking:");
        println!("  Open lots: {}", manager.open_lot_count());
        println!("  Closed lots: {}", manager.closed_lot_count());
        println!("  Realized P&L: {}", manager.realized_pnl());
    }

    Ok(())
}
