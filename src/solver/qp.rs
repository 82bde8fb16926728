//! # Active-Set QP
//!
//! $$
//! \min_{\mathbf{x}}\ \tfrac12\mathbf{x}^\top H\mathbf{x} + \mathbf{c}^\top\mathbf{x}
//! \quad\text{s.t.}\quad A\mathbf{x}=\mathbf{b},\ \mathbf{x}\ge 0
//! $$
//!
//! Primal active-set method for strictly convex QPs whose inequalities are
//! non-negativity bounds. Each iteration solves the equality-constrained KKT
//! system on the free variables; bounds enter the working set when they block
//! a step and leave it when their multiplier turns negative.

use nalgebra::DMatrix;
use nalgebra::DVector;

use crate::error::PortfolioError;
use crate::error::Result;

const FEASIBILITY_TOLERANCE: f64 = 1e-8;

/// Active-set solver settings.
#[derive(Clone, Copy, Debug)]
pub struct ActiveSetQp {
  /// Maximum number of working-set iterations.
  pub max_iters: usize,
  /// Relative tolerance on step length and multiplier signs.
  pub tolerance: f64,
}

impl Default for ActiveSetQp {
  fn default() -> Self {
    Self {
      max_iters: 500,
      tolerance: 1e-10,
    }
  }
}

/// Optimal point of a QP.
#[derive(Clone, Debug)]
pub struct QpSolution {
  pub x: DVector<f64>,
  /// Indices of bounds held at zero at the optimum.
  pub active: Vec<usize>,
  pub iterations: usize,
}

struct KktStep {
  p: DVector<f64>,
  y: DVector<f64>,
}

impl ActiveSetQp {
  pub fn new(max_iters: usize, tolerance: f64) -> Self {
    Self {
      max_iters,
      tolerance,
    }
  }

  /// Solve from a feasible starting point `x0`.
  pub fn solve(
    &self,
    hessian: &DMatrix<f64>,
    linear: &DVector<f64>,
    equality: &DMatrix<f64>,
    rhs: &DVector<f64>,
    x0: DVector<f64>,
  ) -> Result<QpSolution> {
    let n = x0.len();
    let m = equality.nrows();
    if hessian.nrows() != n || hessian.ncols() != n {
      return Err(PortfolioError::dimension("QP hessian", n, hessian.nrows()));
    }
    if linear.len() != n || equality.ncols() != n {
      return Err(PortfolioError::dimension("QP linear term", n, linear.len()));
    }
    if rhs.len() != m {
      return Err(PortfolioError::dimension("QP right-hand side", m, rhs.len()));
    }

    let mut x = x0;
    let residual = (equality * &x - rhs).amax();
    if residual > FEASIBILITY_TOLERANCE * (1.0 + rhs.amax()) || x.iter().any(|v| *v < -FEASIBILITY_TOLERANCE) {
      return Err(PortfolioError::InvalidInput(format!(
        "QP starting point is infeasible (equality residual {residual:e})"
      )));
    }
    x.iter_mut().for_each(|v| *v = v.max(0.0));

    let mut working = self.initial_working_set(equality, &x);
    // set after a full, unblocked step: x minimizes on the current working set
    let mut at_minimizer = false;

    for iter in 0..self.max_iters {
      let free: Vec<usize> = (0..n).filter(|i| !working[*i]).collect();
      let grad = hessian * &x + linear;

      let step = match solve_kkt(hessian, equality, &grad, &free) {
        Some(step) => step,
        None => {
          return Err(PortfolioError::ConvergenceFailure {
            iterations: iter,
            last_weights: x.iter().copied().collect(),
            reason: format!("singular KKT system with {} free variables", free.len()),
          })
        }
      };

      let x_scale = 1.0 + x.amax();
      if at_minimizer || step.p.amax() <= self.tolerance * x_scale {
        at_minimizer = false;
        // stationary on the working set, z_i = g_i + (A^T y)_i for bounded i
        let aty = equality.transpose() * &step.y;
        let g_scale = 1.0 + grad.amax();
        let release = (0..n)
          .filter(|i| working[*i])
          .map(|i| (i, grad[i] + aty[i]))
          .filter(|(_, z)| *z < -self.tolerance * g_scale)
          .min_by(|a, b| a.1.total_cmp(&b.1));

        match release {
          Some((i, z)) => {
            tracing::trace!(iter, index = i, multiplier = z, "releasing bound");
            working[i] = false;
          }
          None => {
            return Ok(QpSolution {
              x,
              active: (0..n).filter(|i| working[*i]).collect(),
              iterations: iter + 1,
            });
          }
        }
        continue;
      }

      let mut alpha = 1.0;
      let mut blocking = None;
      for (k, &i) in free.iter().enumerate() {
        let pi = step.p[k];
        if pi < 0.0 {
          let ratio = -x[i] / pi;
          if ratio < alpha {
            alpha = ratio;
            blocking = Some(i);
          }
        }
      }

      for (k, &i) in free.iter().enumerate() {
        x[i] += alpha * step.p[k];
      }
      match blocking {
        Some(i) => {
          x[i] = 0.0;
          working[i] = true;
        }
        None => at_minimizer = true,
      }
    }

    Err(PortfolioError::ConvergenceFailure {
      iterations: self.max_iters,
      last_weights: x.iter().map(|v| v.max(0.0)).collect(),
      reason: "active-set iteration budget exhausted".to_string(),
    })
  }

  /// Warm start with the bounds already at zero, unless that leaves the
  /// equality rows dependent on the free columns.
  fn initial_working_set(&self, equality: &DMatrix<f64>, x: &DVector<f64>) -> Vec<bool> {
    let n = x.len();
    let m = equality.nrows();
    let working: Vec<bool> = x.iter().map(|v| *v <= 0.0).collect();
    let free: Vec<usize> = (0..n).filter(|i| !working[*i]).collect();

    if m == 0 {
      return working;
    }
    if free.len() >= m {
      let a_free = DMatrix::from_fn(m, free.len(), |r, c| equality[(r, free[c])]);
      if a_free.rank(1e-12) == m {
        return working;
      }
    }

    vec![false; n]
  }
}

fn solve_kkt(
  hessian: &DMatrix<f64>,
  equality: &DMatrix<f64>,
  grad: &DVector<f64>,
  free: &[usize],
) -> Option<KktStep> {
  let f = free.len();
  let m = equality.nrows();
  if f == 0 {
    return None;
  }

  // [H_FF  A_F^T] [p]   [-g_F]
  // [A_F    0   ] [y] = [  0 ]
  let mut kkt = DMatrix::<f64>::zeros(f + m, f + m);
  let mut rhs = DVector::<f64>::zeros(f + m);
  for (r, &i) in free.iter().enumerate() {
    for (c, &j) in free.iter().enumerate() {
      kkt[(r, c)] = hessian[(i, j)];
    }
    for e in 0..m {
      kkt[(r, f + e)] = equality[(e, i)];
      kkt[(f + e, r)] = equality[(e, i)];
    }
    rhs[r] = -grad[i];
  }

  let sol = kkt.lu().solve(&rhs)?;
  if sol.iter().any(|v| !v.is_finite()) {
    return None;
  }

  Some(KktStep {
    p: sol.rows(0, f).into_owned(),
    y: sol.rows(f, m).into_owned(),
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn budget(n: usize) -> (DMatrix<f64>, DVector<f64>) {
    (DMatrix::from_element(1, n, 1.0), DVector::from_element(1, 1.0))
  }

  #[test]
  fn interior_solution_matches_closed_form() {
    // min w' S w on the simplex for S = [[0.04, 0.01], [0.01, 0.09]]
    let h = DMatrix::from_row_slice(2, 2, &[0.08, 0.02, 0.02, 0.18]);
    let (a, b) = budget(2);
    let sol = ActiveSetQp::default()
      .solve(&h, &DVector::zeros(2), &a, &b, DVector::from_element(2, 0.5))
      .unwrap();

    assert_abs_diff_eq!(sol.x[0], 0.08 / 0.11, epsilon = 1e-10);
    assert_abs_diff_eq!(sol.x.sum(), 1.0, epsilon = 1e-12);
    assert!(sol.active.is_empty());
  }

  #[test]
  fn bound_becomes_active() {
    // minimizing 0.5 * |x - (2, -1, 0)|^2 on the simplex pins x_1 at zero
    let h = DMatrix::identity(3, 3);
    let c = DVector::from_vec(vec![-2.0, 1.0, 0.0]);
    let (a, b) = budget(3);
    let sol = ActiveSetQp::default()
      .solve(&h, &c, &a, &b, DVector::from_element(3, 1.0 / 3.0))
      .unwrap();

    assert_abs_diff_eq!(sol.x[0], 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(sol.x[1], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(sol.x[2], 0.0, epsilon = 1e-10);
    assert!(sol.active.contains(&1));
  }

  #[test]
  fn bound_is_released_when_multiplier_is_negative() {
    // start at a vertex whose zero bound is not optimal
    let h = DMatrix::identity(2, 2);
    let (a, b) = budget(2);
    let sol = ActiveSetQp::default()
      .solve(&h, &DVector::zeros(2), &a, &b, DVector::from_vec(vec![1.0, 0.0]))
      .unwrap();

    assert_abs_diff_eq!(sol.x[0], 0.5, epsilon = 1e-10);
    assert_abs_diff_eq!(sol.x[1], 0.5, epsilon = 1e-10);
  }

  #[test]
  fn ill_conditioned_free_set_terminates() {
    // first two assets differ by 1e-9 in covariance
    let e = 1e-9;
    let h = DMatrix::from_row_slice(3, 3, &[0.04, 0.04 - e, 0.01, 0.04 - e, 0.04, 0.01, 0.01, 0.01, 0.09]) * 2.0;
    let (a, b) = budget(3);
    let sol = ActiveSetQp::new(10, 1e-10)
      .solve(&h, &DVector::zeros(3), &a, &b, DVector::from_element(3, 1.0 / 3.0))
      .unwrap();

    assert!(sol.iterations <= 3);
    assert_abs_diff_eq!(sol.x.sum(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(sol.x[0] + sol.x[1], 0.08 / 0.11, epsilon = 1e-6);
  }

  #[test]
  fn infeasible_start_is_rejected() {
    let h = DMatrix::identity(2, 2);
    let (a, b) = budget(2);
    let err = ActiveSetQp::default().solve(
      &h,
      &DVector::zeros(2),
      &a,
      &b,
      DVector::from_vec(vec![0.7, 0.7]),
    );
    assert!(matches!(err, Err(PortfolioError::InvalidInput(_))));
  }

  #[test]
  fn exhausted_budget_reports_last_iterate() {
    let h = DMatrix::identity(3, 3);
    let c = DVector::from_vec(vec![-2.0, 1.0, 0.0]);
    let (a, b) = budget(3);
    let err = ActiveSetQp::new(0, 1e-10)
      .solve(&h, &c, &a, &b, DVector::from_element(3, 1.0 / 3.0))
      .unwrap_err();

    match err {
      PortfolioError::ConvergenceFailure { last_weights, .. } => {
        assert_eq!(last_weights.len(), 3);
        assert_abs_diff_eq!(last_weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
      }
      other => panic!("unexpected error {other:?}"),
    }
  }
}
