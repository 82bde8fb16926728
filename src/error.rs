//! # Errors
//!
//! Failure taxonomy shared by data preparation, the solvers and the engine.

use thiserror::Error;

/// Portfolio construction errors.
#[derive(Debug, Error)]
pub enum PortfolioError {
  /// Upstream market data could not be obtained for a symbol.
  #[error("Market data unavailable for {symbol}: {reason}")]
  DataUnavailable { symbol: String, reason: String },

  /// Covariance matrix is not positive definite.
  #[error("Singular covariance matrix: {reason}")]
  SingularCovariance { reason: String },

  /// Requested target return lies outside the achievable range.
  #[error("Infeasible target return {target}: achievable range is [{min}, {max}]")]
  InfeasibleTarget { target: f64, min: f64, max: f64 },

  /// Numeric solver did not reach a verified optimum.
  ///
  /// `last_weights` holds the final iterate, which satisfies the portfolio
  /// constraints but is not a verified optimum.
  #[error("Solver did not converge after {iterations} iterations: {reason}")]
  ConvergenceFailure {
    iterations: usize,
    last_weights: Vec<f64>,
    reason: String,
  },

  #[error("Insufficient data: required {required}, got {got}")]
  InsufficientData { required: usize, got: usize },

  #[error("Dimension mismatch in {what}: expected {expected}, got {got}")]
  DimensionMismatch {
    what: String,
    expected: usize,
    got: usize,
  },

  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

impl PortfolioError {
  pub(crate) fn data_unavailable(symbol: &str, reason: impl Into<String>) -> Self {
    Self::DataUnavailable {
      symbol: symbol.to_string(),
      reason: reason.into(),
    }
  }

  pub(crate) fn singular(reason: impl Into<String>) -> Self {
    Self::SingularCovariance {
      reason: reason.into(),
    }
  }

  pub(crate) fn dimension(what: &str, expected: usize, got: usize) -> Self {
    Self::DimensionMismatch {
      what: what.to_string(),
      expected,
      got,
    }
  }
}

/// Result type alias for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
