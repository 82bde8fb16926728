//! # Return Series
//!
//! $$
//! r_t = \frac{p_t}{p_{t-1}} - 1 \quad\text{or}\quad r_t = \ln\frac{p_t}{p_{t-1}}
//! $$
//!
//! Price to return conversion and alignment of several assets onto a common window.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use ndarray::Array1;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::market::PriceObservation;

/// How consecutive prices are turned into periodic returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReturnKind {
  /// Percentage change `p_t / p_{t-1} - 1`.
  #[default]
  Simple,
  /// Continuously compounded `ln(p_t / p_{t-1})`.
  Log,
}

/// Ordered periodic returns for one asset.
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct AssetReturnSeries {
  /// Asset identifier, usually the ticker.
  pub id: String,
  /// Returns in time order.
  pub returns: Array1<f64>,
  /// Period end date of each return, when known.
  pub dates: Option<Vec<NaiveDate>>,
}

impl AssetReturnSeries {
  /// Undated series from raw returns.
  pub fn from_returns(id: &str, returns: Vec<f64>) -> Self {
    Self::new(id.to_string(), Array1::from(returns), None)
  }

  /// Build a dated series from time-ordered price observations.
  pub fn from_prices(id: &str, prices: &[PriceObservation], kind: ReturnKind) -> Result<Self> {
    for pair in prices.windows(2) {
      if pair[1].date <= pair[0].date {
        return Err(PortfolioError::InvalidInput(format!(
          "{id}: price observations are not strictly increasing in time ({} then {})",
          pair[0].date, pair[1].date
        )));
      }
    }

    let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
    let returns = match kind {
      ReturnKind::Simple => simple_returns(&closes),
      ReturnKind::Log => log_returns(&closes),
    }
    .map_err(|err| match err {
      PortfolioError::InvalidInput(msg) => PortfolioError::InvalidInput(format!("{id}: {msg}")),
      other => other,
    })?;
    let dates = prices.iter().skip(1).map(|p| p.date).collect();

    Ok(Self::new(id.to_string(), returns, Some(dates)))
  }

  pub fn len(&self) -> usize {
    self.returns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.returns.is_empty()
  }
}

fn check_prices(prices: &[f64]) -> Result<()> {
  if prices.len() < 2 {
    return Err(PortfolioError::InsufficientData {
      required: 2,
      got: prices.len(),
    });
  }

  if let Some((i, p)) = prices
    .iter()
    .enumerate()
    .find(|(_, p)| !p.is_finite() || **p <= 0.0)
  {
    return Err(PortfolioError::InvalidInput(format!(
      "price at index {i} must be finite and positive, got {p}"
    )));
  }

  Ok(())
}

/// Convert prices to simple percentage-change returns.
pub fn simple_returns(prices: &[f64]) -> Result<Array1<f64>> {
  check_prices(prices)?;
  Ok(
    prices
      .windows(2)
      .map(|w| w[1] / w[0] - 1.0)
      .collect(),
  )
}

/// Convert prices to log returns.
pub fn log_returns(prices: &[f64]) -> Result<Array1<f64>> {
  check_prices(prices)?;
  Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Align return series onto a common window.
///
/// When every series carries dates the result keeps only the dates present in
/// all of them. Otherwise each series is cut to the common tail length.
pub fn align_return_series(series: &[AssetReturnSeries]) -> Result<Vec<AssetReturnSeries>> {
  let all_dated = !series.is_empty() && series.iter().all(|s| s.dates.is_some());

  if !all_dated {
    let min_len = series.iter().map(|s| s.len()).min().unwrap_or(0);
    return Ok(
      series
        .iter()
        .map(|s| {
          let start = s.len() - min_len;
          AssetReturnSeries::new(
            s.id.clone(),
            s.returns.slice(ndarray::s![start..]).to_owned(),
            s.dates.as_ref().map(|d| d[start..].to_vec()),
          )
        })
        .collect(),
    );
  }

  let mut common: Option<BTreeSet<NaiveDate>> = None;
  for s in series {
    let dates = s.dates.as_deref().unwrap_or_default();
    if dates.len() != s.len() {
      return Err(PortfolioError::dimension(
        &format!("dates of {}", s.id),
        s.len(),
        dates.len(),
      ));
    }
    let set: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    common = Some(match common {
      Some(acc) => acc.intersection(&set).copied().collect(),
      None => set,
    });
  }
  let common = common.unwrap_or_default();

  Ok(
    series
      .iter()
      .map(|s| {
        let dates = s.dates.as_deref().unwrap_or_default();
        let (kept_dates, kept_returns): (Vec<NaiveDate>, Vec<f64>) = dates
          .iter()
          .zip(s.returns.iter())
          .filter(|(d, _)| common.contains(d))
          .map(|(d, r)| (*d, *r))
          .unzip();
        AssetReturnSeries::new(s.id.clone(), Array1::from(kept_returns), Some(kept_dates))
      })
      .collect(),
  )
}
