//! Currency conversion over the state's market-rate cache.
//!
//! Resolution order: identity, direct pair mid, inverted inverse-pair mid,
//! then failure. No triangulation through a third currency happens here;
//! crosses are split explicitly by the decomposer.

use rust_decimal::Decimal;

use fxdesk_types::pair;

use crate::error::ConvertError;
use crate::state::EngineState;

/// Read-only conversion service borrowing the engine state.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyConverter<'a> {
    state: &'a EngineState,
}

impl<'a> CurrencyConverter<'a> {
    pub fn new(state: &'a EngineState) -> Self {
        Self { state }
    }

    /// Mid rate from one currency to another.
    ///
    /// # Errors
    /// [`ConvertError::MissingRate`] when neither the pair nor its inverse
    /// has a cached quote; [`ConvertError::ZeroRate`] when the inverse quote
    /// cannot be inverted.
    pub fn rate(&self, from: &str, to: &str) -> Result<Decimal, ConvertError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        if let Some(rate) = self.state.market_rate(&pair::join(from, to)) {
            return Ok(rate.mid);
        }

        let inverse = pair::join(to, from);
        if let Some(rate) = self.state.market_rate(&inverse) {
            if rate.mid.is_zero() {
                return Err(ConvertError::ZeroRate(inverse));
            }
            return Ok(Decimal::ONE / rate.mid);
        }

        Err(ConvertError::MissingRate {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Converts an amount between currencies at the mid rate.
    ///
    /// # Errors
    /// Same as [`CurrencyConverter::rate`].
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, ConvertError> {
        Ok(amount * self.rate(from, to)?)
    }

    /// Converts an amount into the state's reporting currency.
    ///
    /// # Errors
    /// Same as [`CurrencyConverter::rate`].
    pub fn convert_to_reporting(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<Decimal, ConvertError> {
        self.convert(amount, currency, self.state.reporting_currency())
    }
}
