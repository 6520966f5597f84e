//! Engine error types.

use thiserror::Error;

use fxdesk_lots::LotError;
use fxdesk_portfolio::PortfolioError;
use fxdesk_types::ConfigError;

/// Errors that terminate a simulation run.
///
/// Recoverable conditions (schema violations, missing rates) never surface
/// here; they are emitted as output records and dispatch continues. An
/// `EngineError` means an invariant broke or the run cannot start.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two events share an ordering key, violating the input contract.
    #[error("duplicate event ordering key ({timestamp}, {sequence_id})")]
    DuplicateEventKey {
        /// Canonical timestamp of the colliding events.
        timestamp: String,
        /// Shared sequence id.
        sequence_id: u64,
    },

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration JSON could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Accounting-state invariant violation.
    #[error("portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),

    /// Lot-layer invariant violation.
    #[error("lot tracking error: {0}")]
    Lot(#[from] LotError),

    /// The record sink rejected a record.
    #[error("sink error: {0}")]
    Sink(String),

    /// Event data could not be loaded.
    #[error("data error: {0}")]
    Data(#[from] fxdesk_data::DataError),
}
