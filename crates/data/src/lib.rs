//! FX Desk Data
//!
//! Columnar event input and output writers: Parquet event files per event
//! kind, the JSONL audit log, the snapshot Parquet series, and the final
//! state JSON.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod loader;
pub mod writer;

pub use error::DataError;
pub use loader::{load_and_merge, load_events};
pub use writer::{write_audit_jsonl, write_final_state_json, write_snapshots_parquet};
