//! # Objectives
//!
//! $$
//! f_{\text{var}}(\mathbf{w}) = \mathbf{w}^\top\Sigma\mathbf{w},\qquad
//! f_{\text{sr}}(\mathbf{w}) = -\frac{\mathbf{w}^\top\mu - r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Smooth objectives handed to the SQP driver.

use argmin::core::CostFunction;
use argmin::core::Gradient;
use nalgebra::DMatrix;
use nalgebra::DVector;

/// Portfolio variance.
pub struct VarianceCost {
  pub cov: DMatrix<f64>,
}

impl VarianceCost {
  /// Exact Hessian `2 Sigma`.
  pub fn hessian(&self) -> DMatrix<f64> {
    &self.cov * 2.0
  }
}

impl CostFunction for VarianceCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let w = DVector::from_column_slice(x);
    Ok(w.dot(&(&self.cov * &w)))
  }
}

impl Gradient for VarianceCost {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let w = DVector::from_column_slice(x);
    Ok((&self.cov * &w * 2.0).iter().copied().collect())
  }
}

/// Negative Sharpe ratio.
pub struct NegativeSharpeCost {
  pub mu: DVector<f64>,
  pub cov: DMatrix<f64>,
  pub risk_free: f64,
}

impl NegativeSharpeCost {
  fn moments(&self, x: &[f64]) -> Result<(DVector<f64>, f64, f64), argmin::core::Error> {
    let w = DVector::from_column_slice(x);
    let sigma_w = &self.cov * &w;
    let var = w.dot(&sigma_w);
    if !(var > 0.0) {
      return Err(argmin::core::Error::msg(format!(
        "portfolio variance {var} is not positive"
      )));
    }
    let excess = w.dot(&self.mu) - self.risk_free;
    Ok((sigma_w, excess, var.sqrt()))
  }
}

impl CostFunction for NegativeSharpeCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let (_, excess, vol) = self.moments(x)?;
    Ok(-excess / vol)
  }
}

impl Gradient for NegativeSharpeCost {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    // d/dw [-(mu'w - rf) / s] = -mu / s + (mu'w - rf) Sigma w / s^3
    let (sigma_w, excess, vol) = self.moments(x)?;
    let vol3 = vol * vol * vol;
    Ok(
      self
        .mu
        .iter()
        .zip(sigma_w.iter())
        .map(|(m, sw)| -m / vol + excess * sw / vol3)
        .collect(),
    )
  }
}
