//! FX Desk Lots
//!
//! Lot-level position tracking with FIFO matching: individual lots, the
//! per-risk-pair lot queue, and the lot manager that owns all queues and
//! the deterministic lot-id counter.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lot;
pub mod manager;
pub mod queue;

pub use error::LotError;
pub use lot::Lot;
pub use manager::{IncomingLeg, LegOutcome, LotManager};
pub use queue::{LotMatch, LotQueue};
