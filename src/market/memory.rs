use std::collections::HashMap;

use chrono::NaiveDate;

use super::MarketDataSource;
use super::PriceObservation;
use crate::error::PortfolioError;
use crate::error::Result;

/// Price histories held in memory, keyed by symbol.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
  prices: HashMap<String, Vec<PriceObservation>>,
}

impl InMemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register (or replace) the history of `symbol`. Observations are sorted by date.
  pub fn insert(&mut self, symbol: &str, mut prices: Vec<PriceObservation>) {
    prices.sort_by_key(|p| p.date);
    self.prices.insert(symbol.to_string(), prices);
  }

  pub fn with_prices(mut self, symbol: &str, prices: Vec<PriceObservation>) -> Self {
    self.insert(symbol, prices);
    self
  }
}

impl MarketDataSource for InMemorySource {
  fn fetch_prices(
    &self,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<PriceObservation>> {
    if start > end {
      return Err(PortfolioError::data_unavailable(
        symbol,
        format!("empty window {start}..{end}"),
      ));
    }

    let history = self
      .prices
      .get(symbol)
      .ok_or_else(|| PortfolioError::data_unavailable(symbol, "unknown symbol"))?;

    let window: Vec<PriceObservation> = history
      .iter()
      .filter(|p| p.date >= start && p.date <= end)
      .copied()
      .collect();

    if window.is_empty() {
      return Err(PortfolioError::data_unavailable(
        symbol,
        format!("no observations between {start} and {end}"),
      ));
    }

    Ok(window)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
  }

  fn source() -> InMemorySource {
    InMemorySource::new().with_prices(
      "AAA",
      vec![
        PriceObservation::new(day(5), 12.0),
        PriceObservation::new(day(1), 10.0),
        PriceObservation::new(day(3), 11.0),
      ],
    )
  }

  #[test]
  fn returns_sorted_window() {
    let prices = source().fetch_prices("AAA", day(1), day(4)).unwrap();
    assert_eq!(
      prices.iter().map(|p| p.date).collect::<Vec<_>>(),
      vec![day(1), day(3)]
    );
  }

  #[test]
  fn unknown_symbol_is_data_unavailable() {
    let err = source().fetch_prices("ZZZ", day(1), day(4)).unwrap_err();
    assert!(matches!(err, PortfolioError::DataUnavailable { ref symbol, .. } if symbol == "ZZZ"));
  }

  #[test]
  fn empty_window_is_data_unavailable() {
    let err = source().fetch_prices("AAA", day(20), day(25)).unwrap_err();
    assert!(matches!(err, PortfolioError::DataUnavailable { .. }));
  }
}
