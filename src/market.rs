//! # Market Data
//!
//! $$
//! (\text{symbol}, [t_0, t_1]) \mapsto \{(t_k, p_{t_k})\}_k
//! $$
//!
//! Price history collaborators feeding the return pipeline.

use chrono::NaiveDate;
use impl_new_derive::ImplNew;

use crate::error::Result;

pub mod memory;
#[cfg(feature = "yahoo")]
pub mod yahoo;

pub use memory::InMemorySource;
#[cfg(feature = "yahoo")]
pub use yahoo::YahooSource;

/// One split/dividend adjusted closing price.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq)]
pub struct PriceObservation {
  pub date: NaiveDate,
  pub close: f64,
}

/// Source of historical prices.
///
/// Implementations return observations in ascending date order within
/// `[start, end]`. Every failure, including an empty window, is reported as
/// [`crate::PortfolioError::DataUnavailable`].
pub trait MarketDataSource {
  fn fetch_prices(
    &self,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<PriceObservation>>;
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for &S {
  fn fetch_prices(
    &self,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<PriceObservation>> {
    (**self).fetch_prices(symbol, start, end)
  }
}
