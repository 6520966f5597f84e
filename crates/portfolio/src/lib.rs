//! FX Desk Portfolio
//!
//! The accounting state of the desk and the valuation services built on
//! top of it: cash balances, net positions, the market-rate cache, the
//! currency converter, and the cross-trade decomposer.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod converter;
pub mod decompose;
pub mod error;
pub mod state;

pub use converter::CurrencyConverter;
pub use decompose::{DecomposedLeg, decompose};
pub use error::{ConvertError, DecomposeError, PortfolioError};
pub use state::{EngineState, MarketRate};
