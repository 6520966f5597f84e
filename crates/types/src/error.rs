use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Currency code is not 3-letter uppercase.
    #[error("invalid currency code '{0}', expected 3 uppercase letters")]
    InvalidCurrency(String),

    /// Pair string is not `BASE/QUOTE`.
    #[error("malformed currency pair '{0}'")]
    MalformedPair(String),

    /// Risk pair is not quoted against the reporting currency.
    #[error("risk pair {pair} must be quoted in reporting currency {reporting}")]
    RiskPairNotInReporting {
        /// Offending risk pair.
        pair: String,
        /// Configured reporting currency.
        reporting: String,
    },

    /// Hedge pair is missing from the risk-pair set.
    #[error("hedge pair {0} is not a configured risk pair")]
    HedgePairNotRisk(String),
}
