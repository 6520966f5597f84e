use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from the lot tracking subsystem.
///
/// These indicate broken invariants rather than recoverable conditions;
/// callers treat them as fatal.
#[derive(Debug, Error)]
pub enum LotError {
    #[error("risk pair {0} is not configured for lot tracking")]
    UnknownRiskPair(String),

    #[error("lot risk pair {lot} does not match queue {queue}")]
    QueueMismatch { lot: String, queue: String },

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    #[error("cannot reduce lot {lot_id} by {amount}, only {remaining} remaining")]
    ReduceExceedsQuantity {
        lot_id: u64,
        amount: Decimal,
        remaining: Decimal,
    },
}
