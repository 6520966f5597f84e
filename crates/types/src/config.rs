//! Configuration schema for a simulation run.
//!
//! Parsed from JSON. Only `reporting_currency` and `lot_tracking` reach the
//! core; `inputs` and `outputs` are consumed by the run binary.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::event::EventType;
use crate::pair;

/// Top-level simulation configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimConfig {
    /// Single global currency in which equity and P&L are summarized.
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,
    /// Lot tracking configuration.
    #[serde(default)]
    pub lot_tracking: LotTrackingConfig,
    /// Input event files (run binary only).
    #[serde(default)]
    pub inputs: Option<InputsConfig>,
    /// Output file targets (run binary only).
    #[serde(default)]
    pub outputs: Option<OutputsConfig>,
}

fn default_reporting_currency() -> String {
    "USD".to_string()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            reporting_currency: default_reporting_currency(),
            lot_tracking: LotTrackingConfig::default(),
            inputs: None,
            outputs: None,
        }
    }
}

impl SimConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_currency(&self.reporting_currency)?;
        self.lot_tracking.validate(&self.reporting_currency)
    }
}

/// Matching rule for lot queues. Only FIFO is defined.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchingRule {
    /// First-in-first-out: the oldest open lot is matched first.
    #[default]
    Fifo,
}

/// Lot tracking configuration.
///
/// Three pair sets with distinct purposes: `risk_pairs` are the direct pairs
/// where lots live (each quoted against the reporting currency),
/// `trade_pairs` are the pairs clients may trade (crosses allowed), and
/// `hedge_pairs` are the pairs the desk may hedge in (a subset of
/// `risk_pairs`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LotTrackingConfig {
    /// Whether lot tracking is active. When false the lot manager is absent
    /// from state and no lot records are emitted.
    #[serde(default)]
    pub enabled: bool,
    /// Queue matching rule.
    #[serde(default)]
    pub matching_rule: MatchingRule,
    /// Direct pairs where lots are held.
    #[serde(default)]
    pub risk_pairs: Vec<String>,
    /// Pairs clients may trade, crosses included.
    #[serde(default)]
    pub trade_pairs: Vec<String>,
    /// Pairs the desk may hedge in.
    #[serde(default)]
    pub hedge_pairs: Vec<String>,
    /// Whether hedge fills feed the lot manager like client trades.
    #[serde(default = "default_true")]
    pub track_hedge_fills: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LotTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            matching_rule: MatchingRule::Fifo,
            risk_pairs: Vec::new(),
            trade_pairs: Vec::new(),
            hedge_pairs: Vec::new(),
            track_hedge_fills: true,
        }
    }
}

impl LotTrackingConfig {
    /// Validates pair sets against the reporting currency.
    ///
    /// A disabled configuration is always valid.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self, reporting_currency: &str) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        for risk_pair in &self.risk_pairs {
            let (_, quote) = pair::split(risk_pair)
                .ok_or_else(|| ConfigError::MalformedPair(risk_pair.clone()))?;
            if quote != reporting_currency {
                return Err(ConfigError::RiskPairNotInReporting {
                    pair: risk_pair.clone(),
                    reporting: reporting_currency.to_string(),
                });
            }
        }

        for trade_pair in &self.trade_pairs {
            if pair::split(trade_pair).is_none() {
                return Err(ConfigError::MalformedPair(trade_pair.clone()));
            }
        }

        for hedge_pair in &self.hedge_pairs {
            if !self.is_risk_pair(hedge_pair) {
                return Err(ConfigError::HedgePairNotRisk(hedge_pair.clone()));
            }
        }

        Ok(())
    }

    /// Checks membership in the risk-pair set.
    #[must_use]
    pub fn is_risk_pair(&self, currency_pair: &str) -> bool {
        self.risk_pairs.iter().any(|p| p == currency_pair)
    }

    /// Checks membership in the trade-pair set.
    #[must_use]
    pub fn is_trade_pair(&self, currency_pair: &str) -> bool {
        self.trade_pairs.iter().any(|p| p == currency_pair)
    }

    /// Checks membership in the hedge-pair set.
    #[must_use]
    pub fn is_hedge_pair(&self, currency_pair: &str) -> bool {
        self.hedge_pairs.iter().any(|p| p == currency_pair)
    }

    /// Checks whether a trade pair is a cross (tradable but not a risk pair).
    #[must_use]
    pub fn is_cross(&self, currency_pair: &str) -> bool {
        self.is_trade_pair(currency_pair) && !self.is_risk_pair(currency_pair)
    }
}

/// Input event files for the run binary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InputsConfig {
    /// Directory containing the event files.
    pub directory: String,
    /// Event-type to file-name mapping.
    #[serde(default)]
    pub files: BTreeMap<EventType, String>,
}

/// Output file targets for the run binary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutputsConfig {
    /// Directory receiving the output files.
    pub directory: String,
    /// Append-only audit log (JSONL).
    #[serde(default = "default_audit_log")]
    pub audit_log: String,
    /// Snapshot time series (Parquet).
    #[serde(default = "default_snapshots")]
    pub snapshots: String,
    /// Final state (JSON).
    #[serde(default = "default_final_state")]
    pub final_state: String,
}

fn default_audit_log() -> String {
    "audit_log.jsonl".to_string()
}

fn default_snapshots() -> String {
    "snapshots.parquet".to_string()
}

fn default_final_state() -> String {
    "final_state.json".to_string()
}

fn validate_currency(currency: &str) -> Result<(), ConfigError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::InvalidCurrency(currency.to_string()));
    }
    Ok(())
}
