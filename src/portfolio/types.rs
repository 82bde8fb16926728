//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Result containers for portfolio optimization.

use nalgebra::DVector;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::returns::ReturnStatistics;

/// Tolerance on `sum(w) = 1`.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
/// Most negative weight accepted as round-off.
pub const NEGATIVE_WEIGHT_TOLERANCE: f64 = 1e-9;

/// Long-only, fully invested portfolio and its model statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Portfolio {
  /// Final portfolio weights, aligned with the statistics' asset ids.
  pub weights: Vec<f64>,
  /// Model expected return `w'mu`.
  pub expected_return: f64,
  /// Model variance `w'Sigma w`.
  pub variance: f64,
  /// Model volatility.
  pub volatility: f64,
  /// Sharpe ratio computed as `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}

impl Portfolio {
  /// Evaluate caller-supplied weights, rejecting short positions and budget violations.
  pub fn from_weights(weights: Vec<f64>, stats: &ReturnStatistics, risk_free: f64) -> Result<Self> {
    if weights.len() != stats.n_assets() {
      return Err(PortfolioError::dimension("weights", stats.n_assets(), weights.len()));
    }
    if let Some((i, w)) = weights
      .iter()
      .enumerate()
      .find(|(_, w)| !w.is_finite() || **w < -NEGATIVE_WEIGHT_TOLERANCE)
    {
      return Err(PortfolioError::InvalidInput(format!(
        "weight of {} must be non-negative, got {w}",
        stats.ids()[i]
      )));
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
      return Err(PortfolioError::InvalidInput(format!(
        "weights must sum to 1, got {total}"
      )));
    }

    Ok(Self::evaluate(weights, stats, risk_free))
  }

  /// Clean solver round-off (clamp tiny negatives, renormalize) and compute statistics.
  pub(crate) fn evaluate(mut weights: Vec<f64>, stats: &ReturnStatistics, risk_free: f64) -> Self {
    for w in weights.iter_mut() {
      if *w < 0.0 {
        *w = 0.0;
      }
    }
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
      weights.iter_mut().for_each(|w| *w /= total);
    }

    let w = DVector::from_column_slice(&weights);
    let expected_return = w.dot(stats.mean());
    let variance = w.dot(&(stats.covariance() * &w)).max(0.0);
    let volatility = variance.sqrt();
    let sharpe = if volatility > 1e-15 {
      (expected_return - risk_free) / volatility
    } else {
      0.0
    };

    Self {
      weights,
      expected_return,
      variance,
      volatility,
      sharpe,
    }
  }

  /// Per-asset contributions `w_i (Sigma w)_i / sigma_p`; they sum to the volatility.
  pub fn risk_contributions(&self, stats: &ReturnStatistics) -> Vec<f64> {
    if self.volatility <= 1e-15 {
      return vec![0.0; self.weights.len()];
    }
    let w = DVector::from_column_slice(&self.weights);
    let sigma_w = stats.covariance() * &w;
    w.iter()
      .zip(sigma_w.iter())
      .map(|(wi, swi)| wi * swi / self.volatility)
      .collect()
  }

  /// Weighted average asset volatility over portfolio volatility.
  pub fn diversification_ratio(&self, stats: &ReturnStatistics) -> f64 {
    if self.volatility <= 1e-15 {
      return 1.0;
    }
    let weighted: f64 = self
      .weights
      .iter()
      .zip(stats.volatilities().iter())
      .map(|(w, s)| w * s)
      .sum();
    weighted / self.volatility
  }

  /// Herfindahl-Hirschman concentration of the weights.
  pub fn concentration(&self) -> f64 {
    self.weights.iter().map(|w| w * w).sum()
  }
}

/// Minimum-variance portfolios ordered by ascending target return.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EfficientFrontier {
  pub points: Vec<Portfolio>,
}

impl EfficientFrontier {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Portfolio> {
    self.points.iter()
  }

  pub fn returns(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.expected_return).collect()
  }

  pub fn volatilities(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.volatility).collect()
  }

  /// Frontier point with the highest Sharpe ratio.
  pub fn best_sharpe(&self) -> Option<&Portfolio> {
    self.points.iter().max_by(|a, b| a.sharpe.total_cmp(&b.sharpe))
  }
}

impl<'a> IntoIterator for &'a EfficientFrontier {
  type Item = &'a Portfolio;
  type IntoIter = std::slice::Iter<'a, Portfolio>;

  fn into_iter(self) -> Self::IntoIter {
    self.points.iter()
  }
}

/// Everything a presentation layer needs for one optimization request.
#[derive(Clone, Debug)]
pub struct OptimizationReport {
  pub statistics: ReturnStatistics,
  pub risk_free: f64,
  pub min_variance: Portfolio,
  pub max_sharpe: Portfolio,
  pub frontier: EfficientFrontier,
}

impl OptimizationReport {
  pub fn ids(&self) -> &[String] {
    self.statistics.ids()
  }
}
