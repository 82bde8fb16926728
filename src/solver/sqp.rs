//! # SQP
//!
//! $$
//! \mathbf{d}_k=\arg\min_{\mathbf{d}}\ \nabla f(\mathbf{x}_k)^\top\mathbf{d}+\tfrac12\mathbf{d}^\top B_k\mathbf{d}
//! \quad\text{s.t.}\quad A(\mathbf{x}_k+\mathbf{d})=\mathbf{b},\ \mathbf{x}_k+\mathbf{d}\ge 0
//! $$
//!
//! Sequential quadratic programming for smooth objectives under linear
//! equalities and non-negativity. The feasible region is convex, so every
//! iterate stays feasible and the line search works on the objective alone.

use argmin::core::CostFunction;
use argmin::core::Gradient;
use nalgebra::DMatrix;
use nalgebra::DVector;

use super::qp::ActiveSetQp;
use crate::error::PortfolioError;
use crate::error::Result;

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 50;

/// Curvature model used in the QP subproblems.
#[derive(Clone, Debug)]
pub enum HessianUpdate {
  /// Exact, constant Hessian of a quadratic objective.
  Fixed(DMatrix<f64>),
  /// Powell-damped BFGS started from the given matrix.
  DampedBfgs(DMatrix<f64>),
}

/// SQP driver settings.
#[derive(Clone, Copy, Debug)]
pub struct Sqp {
  /// Maximum number of outer iterations.
  pub max_iters: usize,
  /// Convergence threshold on the max-norm of the QP step.
  pub tolerance: f64,
  /// Subproblem solver.
  pub qp: ActiveSetQp,
}

impl Default for Sqp {
  fn default() -> Self {
    Self {
      max_iters: 200,
      tolerance: 1e-9,
      qp: ActiveSetQp::default(),
    }
  }
}

/// Converged SQP iterate.
#[derive(Clone, Debug)]
pub struct SqpOutcome {
  pub x: DVector<f64>,
  pub cost: f64,
  pub iterations: usize,
}

fn objective_error(iterations: usize, x: &DVector<f64>, err: argmin::core::Error) -> PortfolioError {
  PortfolioError::ConvergenceFailure {
    iterations,
    last_weights: x.iter().copied().collect(),
    reason: format!("objective evaluation failed: {err}"),
  }
}

impl Sqp {
  /// Minimize `problem` from the feasible point `x0`.
  pub fn minimize<O>(
    &self,
    problem: &O,
    hessian: HessianUpdate,
    equality: &DMatrix<f64>,
    rhs: &DVector<f64>,
    x0: DVector<f64>,
  ) -> Result<SqpOutcome>
  where
    O: CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
  {
    let n = x0.len();
    let (mut b, bfgs) = match hessian {
      HessianUpdate::Fixed(h) => (h, false),
      HessianUpdate::DampedBfgs(h) => (h, true),
    };
    if b.nrows() != n || b.ncols() != n {
      return Err(PortfolioError::dimension("SQP hessian", n, b.nrows()));
    }

    let eval = |x: &DVector<f64>, iter: usize| -> Result<(f64, DVector<f64>)> {
      let p: Vec<f64> = x.iter().copied().collect();
      let f = problem.cost(&p).map_err(|e| objective_error(iter, x, e))?;
      let g = problem.gradient(&p).map_err(|e| objective_error(iter, x, e))?;
      if g.len() != n {
        return Err(PortfolioError::dimension("objective gradient", n, g.len()));
      }
      Ok((f, DVector::from_vec(g)))
    };

    let mut x = x0;
    let (mut f, mut g) = eval(&x, 0)?;

    for iter in 0..self.max_iters {
      // subproblem in y = x + d: min 0.5 y'By + (g - Bx)'y
      let linear = &g - &b * &x;
      let qp = self.qp.solve(&b, &linear, equality, rhs, x.clone()).map_err(|err| match err {
        PortfolioError::ConvergenceFailure { reason, .. } => PortfolioError::ConvergenceFailure {
          iterations: iter,
          last_weights: x.iter().copied().collect(),
          reason: format!("QP subproblem failed: {reason}"),
        },
        other => other,
      })?;
      let d = &qp.x - &x;
      let step_norm = d.amax();

      if step_norm <= self.tolerance {
        tracing::debug!(iterations = iter + 1, cost = f, "SQP converged");
        return Ok(SqpOutcome {
          x,
          cost: f,
          iterations: iter + 1,
        });
      }

      let slope = g.dot(&d);
      if slope >= -f64::EPSILON * (1.0 + f.abs()) {
        // no descent left beyond round-off of the objective
        tracing::debug!(iterations = iter + 1, cost = f, slope, "SQP stopped on non-descent step");
        return Ok(SqpOutcome {
          x,
          cost: f,
          iterations: iter + 1,
        });
      }

      let mut alpha = 1.0;
      let mut accepted = None;
      for _ in 0..MAX_BACKTRACKS {
        let candidate = &x + &d * alpha;
        let (f_new, g_new) = eval(&candidate, iter)?;
        if f_new <= f + ARMIJO_C * alpha * slope {
          accepted = Some((candidate, f_new, g_new));
          break;
        }
        alpha *= 0.5;
      }

      let Some((x_new, f_new, g_new)) = accepted else {
        if step_norm <= self.tolerance.sqrt() {
          tracing::debug!(iterations = iter + 1, cost = f, step_norm, "SQP stalled at round-off level");
          return Ok(SqpOutcome {
            x,
            cost: f,
            iterations: iter + 1,
          });
        }
        return Err(PortfolioError::ConvergenceFailure {
          iterations: iter + 1,
          last_weights: x.iter().copied().collect(),
          reason: format!("line search failed (step norm {step_norm:e}, slope {slope:e})"),
        });
      };

      if bfgs {
        damped_bfgs_update(&mut b, &(&x_new - &x), &(&g_new - &g));
      }

      tracing::trace!(iter, cost = f_new, alpha, step_norm, "SQP step");
      x = x_new;
      f = f_new;
      g = g_new;
    }

    Err(PortfolioError::ConvergenceFailure {
      iterations: self.max_iters,
      last_weights: x.iter().copied().collect(),
      reason: "SQP iteration budget exhausted".to_string(),
    })
  }
}

/// Powell's damped BFGS update, keeping `b` positive definite.
fn damped_bfgs_update(b: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
  let bs = &*b * s;
  let sbs = s.dot(&bs);
  if sbs <= f64::EPSILON * s.norm_squared() {
    return;
  }

  let sy = s.dot(y);
  let theta = if sy >= 0.2 * sbs {
    1.0
  } else {
    0.8 * sbs / (sbs - sy)
  };
  let r = y * theta + &bs * (1.0 - theta);
  let sr = s.dot(&r);
  if sr <= 0.0 {
    return;
  }

  *b -= &bs * bs.transpose() / sbs;
  *b += &r * r.transpose() / sr;
}
