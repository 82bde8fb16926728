//! # Return Statistics
//!
//! $$
//! \mu_i = \frac1T\sum_t r_{i,t},\qquad \Sigma_{ij} = \frac{1}{T-1}\sum_t (r_{i,t}-\mu_i)(r_{j,t}-\mu_j)
//! $$
//!
//! Immutable mean/covariance snapshot for a fixed window of aligned returns.

use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;

use super::series::align_return_series;
use super::series::AssetReturnSeries;
use crate::error::PortfolioError;
use crate::error::Result;

/// Trading-day annualization convention.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Smallest admissible eigenvalue of the covariance, relative to the largest.
const MIN_RELATIVE_EIGENVALUE: f64 = 1e-12;

const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Mean-return vector and covariance matrix of a set of assets.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStatistics {
  ids: Vec<String>,
  mean: DVector<f64>,
  covariance: DMatrix<f64>,
  observations: Option<usize>,
}

impl ReturnStatistics {
  /// Snapshot from caller-supplied moments.
  pub fn new(ids: Vec<String>, mean: Vec<f64>, covariance: Vec<Vec<f64>>) -> Result<Self> {
    let n = mean.len();
    if covariance.len() != n {
      return Err(PortfolioError::dimension("covariance rows", n, covariance.len()));
    }
    for row in &covariance {
      if row.len() != n {
        return Err(PortfolioError::dimension("covariance columns", n, row.len()));
      }
    }

    let cov = DMatrix::from_fn(n, n, |i, j| covariance[i][j]);
    Self::from_moments(ids, DVector::from_vec(mean), cov)
  }

  /// Snapshot from nalgebra moments.
  pub fn from_moments(ids: Vec<String>, mean: DVector<f64>, covariance: DMatrix<f64>) -> Result<Self> {
    let n = mean.len();
    if n == 0 {
      return Err(PortfolioError::InsufficientData { required: 1, got: 0 });
    }
    if ids.len() != n {
      return Err(PortfolioError::dimension("asset ids", n, ids.len()));
    }
    if covariance.nrows() != n || covariance.ncols() != n {
      return Err(PortfolioError::dimension(
        "covariance",
        n,
        covariance.nrows().max(covariance.ncols()),
      ));
    }
    if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
      return Err(PortfolioError::InvalidInput(
        "mean and covariance entries must be finite".to_string(),
      ));
    }

    for i in 0..n {
      for j in (i + 1)..n {
        let (a, b) = (covariance[(i, j)], covariance[(j, i)]);
        if (a - b).abs() > SYMMETRY_TOLERANCE * a.abs().max(b.abs()).max(1.0) {
          return Err(PortfolioError::InvalidInput(format!(
            "covariance is not symmetric at ({i}, {j}): {a} vs {b}"
          )));
        }
      }
    }
    let covariance = (&covariance + covariance.transpose()) * 0.5;

    Ok(Self {
      ids,
      mean,
      covariance,
      observations: None,
    })
  }

  /// Sample mean and covariance (`ddof = 1`) of aligned return series.
  pub fn from_series(series: &[AssetReturnSeries]) -> Result<Self> {
    if series.is_empty() {
      return Err(PortfolioError::InsufficientData { required: 1, got: 0 });
    }

    let aligned = align_return_series(series)?;
    let n = aligned.len();
    let t = aligned.iter().map(|s| s.len()).min().unwrap_or(0);
    if t < 2 {
      return Err(PortfolioError::InsufficientData { required: 2, got: t });
    }

    // assets x observations
    let panel = Array2::from_shape_fn((n, t), |(i, k)| aligned[i].returns[k]);
    if panel.iter().any(|v| !v.is_finite()) {
      return Err(PortfolioError::InvalidInput(
        "return series contain non-finite values".to_string(),
      ));
    }

    let mean = panel
      .mean_axis(Axis(1))
      .ok_or(PortfolioError::InsufficientData { required: 2, got: t })?;
    let cov = panel
      .cov(1.0)
      .map_err(|_| PortfolioError::InsufficientData { required: 2, got: t })?;

    let ids = aligned.iter().map(|s| s.id.clone()).collect();
    let mut stats = Self::from_moments(
      ids,
      DVector::from_iterator(n, mean.iter().copied()),
      DMatrix::from_fn(n, n, |i, j| cov[[i, j]]),
    )?;
    stats.observations = Some(t);

    Ok(stats)
  }

  pub fn ids(&self) -> &[String] {
    &self.ids
  }

  pub fn mean(&self) -> &DVector<f64> {
    &self.mean
  }

  pub fn covariance(&self) -> &DMatrix<f64> {
    &self.covariance
  }

  /// Number of return observations behind the estimate, when built from series.
  pub fn observations(&self) -> Option<usize> {
    self.observations
  }

  pub fn n_assets(&self) -> usize {
    self.mean.len()
  }

  /// Scale per-period moments by `periods_per_year`.
  pub fn annualized(&self, periods_per_year: f64) -> Self {
    Self {
      ids: self.ids.clone(),
      mean: &self.mean * periods_per_year,
      covariance: &self.covariance * periods_per_year,
      observations: self.observations,
    }
  }

  /// Per-asset standard deviations.
  pub fn volatilities(&self) -> DVector<f64> {
    self.covariance.diagonal().map(|v| v.max(0.0).sqrt())
  }

  /// Correlation matrix implied by the covariance.
  pub fn correlation(&self) -> DMatrix<f64> {
    let sigma = self.volatilities();
    let n = self.n_assets();
    DMatrix::from_fn(n, n, |i, j| {
      let denom = sigma[i] * sigma[j];
      if i == j {
        1.0
      } else if denom > 1e-15 {
        (self.covariance[(i, j)] / denom).clamp(-1.0, 1.0)
      } else {
        0.0
      }
    })
  }

  /// Smallest and largest achievable single-period expected return.
  pub fn return_range(&self) -> (f64, f64) {
    self.mean.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| {
      (lo.min(m), hi.max(m))
    })
  }

  /// Fail with [`PortfolioError::SingularCovariance`] unless the covariance is positive definite.
  pub fn ensure_positive_definite(&self) -> Result<()> {
    let eigenvalues = self.covariance.symmetric_eigenvalues();
    let min = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    let max = eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max > 0.0 && min > MIN_RELATIVE_EIGENVALUE * max {
      return Ok(());
    }

    let n = self.n_assets();
    let context = match self.observations {
      Some(t) if t <= n => format!(" ({t} observations for {n} assets)"),
      Some(t) => format!(" ({t} observations for {n} assets; check for duplicated or constant series)"),
      None => String::new(),
    };
    Err(PortfolioError::singular(format!(
      "smallest eigenvalue {min:e} vs largest {max:e} for assets [{}]{context}",
      self.ids.join(", ")
    )))
  }
}
