use thiserror::Error;

/// Accounting-state errors.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("malformed currency pair '{0}'")]
    MalformedPair(String),
}

/// Rate-resolution errors from the currency converter.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Neither the pair nor its inverse has a cached quote.
    #[error("no market rate available for {from}/{to} or {to}/{from}")]
    MissingRate { from: String, to: String },

    /// The cached inverse quote has a zero mid.
    #[error("cannot invert zero rate for {0}")]
    ZeroRate(String),
}

/// Errors from cross-trade decomposition.
///
/// `reason()` classifies the error for the `lot_tracking_error` record the
/// handler emits; the accounting side of the trade still applies.
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("malformed currency pair '{0}'")]
    MalformedPair(String),

    #[error("{0} is not an allowed trade pair")]
    PairNotTradable(String),

    #[error("risk pair {0} is not configured")]
    RiskPairNotConfigured(String),

    #[error(transparent)]
    Rate(#[from] ConvertError),
}

impl DecomposeError {
    /// Error kind recorded on the emitted `lot_tracking_error` record.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            DecomposeError::Rate(_) => "missing_rate",
            _ => "decomposition_error",
        }
    }
}
