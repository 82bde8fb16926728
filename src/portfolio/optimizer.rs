//! # Portfolio Optimizer
//!
//! $$
//! \min_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1} \mathbf{w}^\top\Sigma\mathbf{w}
//! \quad\text{optionally s.t.}\quad \mu^\top\mathbf{w}=r^\*
//! $$
//!
//! Global minimum-variance, maximum-Sharpe and efficient-frontier portfolios
//! under long-only, fully invested constraints.

use nalgebra::DMatrix;
use nalgebra::DVector;

use super::objectives::NegativeSharpeCost;
use super::objectives::VarianceCost;
use super::types::EfficientFrontier;
use super::types::Portfolio;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::returns::ReturnStatistics;
use crate::solver::ActiveSetQp;
use crate::solver::HessianUpdate;
use crate::solver::Sqp;

/// Relative tolerance for deciding that a target return sits on the achievable boundary.
const TARGET_TOLERANCE: f64 = 1e-12;

/// Which part of the minimum-variance frontier is sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontierRange {
  /// Targets from the lowest to the highest asset mean.
  #[default]
  Full,
  /// Targets from the minimum-variance portfolio's return to the highest asset mean.
  Efficient,
}

/// Single-portfolio optimization goals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Objective {
  MinVariance,
  MaxSharpe,
  /// Minimum variance at the given expected return.
  TargetReturn(f64),
}

/// Runtime configuration for [`PortfolioOptimizer`].
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizerConfig {
  /// Risk-free rate used in Sharpe computations, in the same period as the statistics.
  pub risk_free: f64,
  /// Number of frontier portfolios.
  pub frontier_points: usize,
  pub frontier_range: FrontierRange,
  /// SQP iteration budget.
  pub max_iters: usize,
  /// Active-set iteration budget per QP subproblem.
  pub qp_max_iters: usize,
  /// Convergence threshold on the SQP step.
  pub tolerance: f64,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.0,
      frontier_points: 30,
      frontier_range: FrontierRange::Full,
      max_iters: 200,
      qp_max_iters: 500,
      tolerance: 1e-9,
    }
  }
}

impl OptimizerConfig {
  /// Reject settings no solver run can honor.
  pub fn validate(&self) -> Result<()> {
    if !self.risk_free.is_finite() {
      return Err(PortfolioError::InvalidInput(format!(
        "risk-free rate must be finite, got {}",
        self.risk_free
      )));
    }
    if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
      return Err(PortfolioError::InvalidInput(format!(
        "solver tolerance must be positive and finite, got {}",
        self.tolerance
      )));
    }
    Ok(())
  }
}

/// Mean-variance optimizer. Stateless: every call is a pure function of its inputs.
#[derive(Clone, Debug, Default)]
pub struct PortfolioOptimizer {
  config: OptimizerConfig,
}

fn budget_constraint(n: usize) -> (DMatrix<f64>, DVector<f64>) {
  (DMatrix::from_element(1, n, 1.0), DVector::from_element(1, 1.0))
}

fn equal_weights(n: usize) -> DVector<f64> {
  DVector::from_element(n, 1.0 / n as f64)
}

fn boundary_tolerance(lo: f64, hi: f64) -> f64 {
  TARGET_TOLERANCE * (hi - lo).max(lo.abs()).max(hi.abs()).max(f64::MIN_POSITIVE)
}

/// Map `target` into the achievable return range of `stats`.
pub fn clamp_target(stats: &ReturnStatistics, target: f64) -> f64 {
  let (lo, hi) = stats.return_range();
  let clamped = target.clamp(lo, hi);
  if clamped != target {
    tracing::warn!(target, clamped, min = lo, max = hi, "target return clamped into feasible range");
  }
  clamped
}

impl PortfolioOptimizer {
  pub fn new(config: OptimizerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  fn sqp(&self) -> Sqp {
    Sqp {
      max_iters: self.config.max_iters,
      tolerance: self.config.tolerance,
      qp: ActiveSetQp::new(self.config.qp_max_iters, ActiveSetQp::default().tolerance),
    }
  }

  /// Dispatch on an [`Objective`].
  pub fn optimize(&self, stats: &ReturnStatistics, objective: Objective) -> Result<Portfolio> {
    match objective {
      Objective::MinVariance => self.min_variance(stats),
      Objective::MaxSharpe => self.max_sharpe(stats),
      Objective::TargetReturn(target) => self.min_variance_for_target(stats, target),
    }
  }

  /// Global minimum-variance portfolio.
  pub fn min_variance(&self, stats: &ReturnStatistics) -> Result<Portfolio> {
    self.config.validate()?;
    stats.ensure_positive_definite()?;
    self.solve_min_variance(stats)
  }

  /// Maximum-Sharpe portfolio started from equal weights.
  pub fn max_sharpe(&self, stats: &ReturnStatistics) -> Result<Portfolio> {
    let start = vec![1.0 / stats.n_assets() as f64; stats.n_assets()];
    self.max_sharpe_from(stats, &start)
  }

  /// Maximum-Sharpe portfolio started from a caller-chosen feasible portfolio.
  pub fn max_sharpe_from(&self, stats: &ReturnStatistics, start: &[f64]) -> Result<Portfolio> {
    self.config.validate()?;
    stats.ensure_positive_definite()?;
    let start = Portfolio::from_weights(start.to_vec(), stats, self.config.risk_free)?;

    let n = stats.n_assets();
    let cost = NegativeSharpeCost {
      mu: stats.mean().clone(),
      cov: stats.covariance().clone(),
      risk_free: self.config.risk_free,
    };

    // curvature of the dominant |S| Sigma / sigma^2 term at the start point
    let scale = start.sharpe.abs().max(0.1) / start.variance;
    let b0 = stats.covariance() * scale;
    let (a, b) = budget_constraint(n);

    let out = self.sqp().minimize(
      &cost,
      HessianUpdate::DampedBfgs(b0),
      &a,
      &b,
      DVector::from_vec(start.weights),
    )?;
    tracing::debug!(iterations = out.iterations, sharpe = -out.cost, "max-Sharpe portfolio solved");

    Ok(Portfolio::evaluate(
      out.x.iter().copied().collect(),
      stats,
      self.config.risk_free,
    ))
  }

  /// Minimum-variance portfolio whose expected return equals `target`.
  pub fn min_variance_for_target(&self, stats: &ReturnStatistics, target: f64) -> Result<Portfolio> {
    self.config.validate()?;
    stats.ensure_positive_definite()?;
    self.solve_target(stats, target)
  }

  /// Minimum-variance portfolios for evenly spaced target returns.
  pub fn efficient_frontier(&self, stats: &ReturnStatistics) -> Result<EfficientFrontier> {
    self.config.validate()?;
    stats.ensure_positive_definite()?;

    let gmv_return = match self.config.frontier_range {
      FrontierRange::Full => None,
      FrontierRange::Efficient => Some(self.solve_min_variance(stats)?.expected_return),
    };

    let targets = self.frontier_targets(stats, gmv_return);
    let mut points = Vec::with_capacity(targets.len());
    for (k, target) in targets.into_iter().enumerate() {
      let point = self.solve_target(stats, target)?;
      tracing::debug!(
        point = k,
        target,
        volatility = point.volatility,
        "frontier point solved"
      );
      points.push(point);
    }

    Ok(EfficientFrontier { points })
  }

  /// Target returns sampled by [`Self::efficient_frontier`].
  pub fn frontier_targets(&self, stats: &ReturnStatistics, gmv_return: Option<f64>) -> Vec<f64> {
    let (lo, hi) = stats.return_range();
    let start = gmv_return.map_or(lo, |r| r.clamp(lo, hi));
    let m = self.config.frontier_points;

    if m == 0 {
      return Vec::new();
    }
    if m == 1 || hi - start <= boundary_tolerance(lo, hi) {
      return vec![start];
    }

    (0..m)
      .map(|k| {
        if k + 1 == m {
          hi
        } else {
          start + (hi - start) * k as f64 / (m - 1) as f64
        }
      })
      .collect()
  }

  fn solve_min_variance(&self, stats: &ReturnStatistics) -> Result<Portfolio> {
    let n = stats.n_assets();
    let cost = VarianceCost {
      cov: stats.covariance().clone(),
    };
    let (a, b) = budget_constraint(n);
    let out = self.sqp().minimize(
      &cost,
      HessianUpdate::Fixed(cost.hessian()),
      &a,
      &b,
      equal_weights(n),
    )?;

    Ok(Portfolio::evaluate(
      out.x.iter().copied().collect(),
      stats,
      self.config.risk_free,
    ))
  }

  fn solve_target(&self, stats: &ReturnStatistics, target: f64) -> Result<Portfolio> {
    if !target.is_finite() {
      return Err(PortfolioError::InvalidInput(format!(
        "target return must be finite, got {target}"
      )));
    }

    let (lo, hi) = stats.return_range();
    let tol = boundary_tolerance(lo, hi);
    if target < lo - tol || target > hi + tol {
      return Err(PortfolioError::InfeasibleTarget {
        target,
        min: lo,
        max: hi,
      });
    }

    let span = hi - lo;
    if span <= tol {
      // every portfolio earns the common mean
      return self.solve_min_variance(stats);
    }

    let mu = stats.mean();
    if target >= hi - tol || target <= lo + tol {
      // the feasible set collapses onto the assets sharing the extreme mean
      let extreme = if target >= hi - tol { hi } else { lo };
      let subset: Vec<usize> = (0..mu.len())
        .filter(|&i| (mu[i] - extreme).abs() <= tol)
        .collect();
      return self.solve_on_subset(stats, &subset);
    }

    let n = stats.n_assets();
    let equality = DMatrix::from_fn(2, n, |r, i| if r == 0 { 1.0 } else { (mu[i] - lo) / span });
    let rhs = DVector::from_vec(vec![1.0, (target - lo) / span]);
    let cost = VarianceCost {
      cov: stats.covariance().clone(),
    };
    let out = self.sqp().minimize(
      &cost,
      HessianUpdate::Fixed(cost.hessian()),
      &equality,
      &rhs,
      target_start(mu, target),
    )?;

    Ok(Portfolio::evaluate(
      out.x.iter().copied().collect(),
      stats,
      self.config.risk_free,
    ))
  }

  fn solve_on_subset(&self, stats: &ReturnStatistics, subset: &[usize]) -> Result<Portfolio> {
    let n = stats.n_assets();
    let mut weights = vec![0.0; n];

    if let [only] = subset {
      weights[*only] = 1.0;
    } else {
      let k = subset.len();
      let cov = stats.covariance();
      let cost = VarianceCost {
        cov: DMatrix::from_fn(k, k, |r, c| cov[(subset[r], subset[c])]),
      };
      let (a, b) = budget_constraint(k);
      let out = self.sqp().minimize(
        &cost,
        HessianUpdate::Fixed(cost.hessian()),
        &a,
        &b,
        equal_weights(k),
      )?;
      for (r, &i) in subset.iter().enumerate() {
        weights[i] = out.x[r];
      }
    }

    Ok(Portfolio::evaluate(weights, stats, self.config.risk_free))
  }
}

/// Equal weights mixed with the highest (or lowest) mean asset so that `mu'x = target`.
fn target_start(mu: &DVector<f64>, target: f64) -> DVector<f64> {
  let n = mu.len();
  let mean = mu.mean();
  let pick = |better: fn(f64, f64) -> bool| {
    (0..n).fold(0, |best, i| if better(mu[i], mu[best]) { i } else { best })
  };
  let k = if target >= mean {
    pick(|a, b| a > b)
  } else {
    pick(|a, b| a < b)
  };

  let gap = mu[k] - mean;
  let t = if gap.abs() > 0.0 {
    ((target - mean) / gap).clamp(0.0, 1.0)
  } else {
    0.0
  };

  let mut x = equal_weights(n) * (1.0 - t);
  x[k] += t;
  x
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use tracing_test::traced_test;

  use super::*;
  use crate::returns::AssetReturnSeries;

  fn two_assets() -> ReturnStatistics {
    ReturnStatistics::new(
      vec!["A".into(), "B".into()],
      vec![0.08, 0.12],
      vec![vec![0.04, 0.01], vec![0.01, 0.09]],
    )
    .unwrap()
  }

  fn four_assets() -> ReturnStatistics {
    ReturnStatistics::new(
      vec!["A".into(), "B".into(), "C".into(), "D".into()],
      vec![0.05, 0.09, 0.12, 0.07],
      vec![
        vec![0.020, 0.004, 0.006, 0.002],
        vec![0.004, 0.060, 0.012, 0.010],
        vec![0.006, 0.012, 0.110, 0.004],
        vec![0.002, 0.010, 0.004, 0.035],
      ],
    )
    .unwrap()
  }

  fn assert_valid(p: &Portfolio) {
    let total: f64 = p.weights.iter().sum();
    assert!((total - 1.0).abs() < 1e-6, "weights sum to {total}");
    assert!(p.weights.iter().all(|w| *w >= -1e-9), "negative weight in {:?}", p.weights);
  }

  /// Tangency portfolio via the convex reformulation min y'Sy s.t. (mu - rf)'y = 1, y >= 0.
  fn tangency_reference(stats: &ReturnStatistics, rf: f64) -> Vec<f64> {
    let n = stats.n_assets();
    let excess = stats.mean().map(|m| m - rf);
    let k = excess.argmax().0;
    let mut y0 = DVector::zeros(n);
    y0[k] = 1.0 / excess[k];
    let a = DMatrix::from_fn(1, n, |_, i| excess[i]);
    let b = DVector::from_element(1, 1.0);
    let sol = ActiveSetQp::default()
      .solve(&(stats.covariance() * 2.0), &DVector::zeros(n), &a, &b, y0)
      .unwrap();
    let total = sol.x.sum();
    sol.x.iter().map(|y| y / total).collect()
  }

  #[test]
  fn two_asset_min_variance_matches_closed_form() {
    let p = PortfolioOptimizer::default().min_variance(&two_assets()).unwrap();
    // (s2^2 - s12) / (s1^2 + s2^2 - 2 s12)
    let w1 = (0.09 - 0.01) / (0.04 + 0.09 - 2.0 * 0.01);
    assert_abs_diff_eq!(p.weights[0], w1, epsilon = 1e-4);
    assert_valid(&p);
  }

  #[test]
  fn min_variance_binds_long_only_constraint() {
    // unconstrained solution shorts B
    let stats = ReturnStatistics::new(
      vec!["A".into(), "B".into()],
      vec![0.05, 0.10],
      vec![vec![0.01, 0.018], vec![0.018, 0.09]],
    )
    .unwrap();
    let p = PortfolioOptimizer::default().min_variance(&stats).unwrap();
    assert_abs_diff_eq!(p.weights[0], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(p.weights[1], 0.0, epsilon = 1e-9);
  }

  #[test]
  fn max_sharpe_matches_convex_reformulation() {
    let stats = four_assets();
    let opt = PortfolioOptimizer::new(OptimizerConfig {
      risk_free: 0.02,
      ..OptimizerConfig::default()
    });
    let p = opt.max_sharpe(&stats).unwrap();
    let reference = tangency_reference(&stats, 0.02);

    assert_valid(&p);
    for (w, r) in p.weights.iter().zip(reference.iter()) {
      assert_abs_diff_eq!(*w, *r, epsilon = 1e-4);
    }
  }

  #[test]
  fn max_sharpe_beats_every_frontier_point() {
    let stats = four_assets();
    let opt = PortfolioOptimizer::default();
    let best = opt.max_sharpe(&stats).unwrap();
    let frontier = opt.efficient_frontier(&stats).unwrap();

    for point in &frontier {
      assert!(best.sharpe >= point.sharpe - 1e-8);
    }
  }

  #[test]
  fn frontier_points_are_valid_and_hit_their_targets() {
    let stats = four_assets();
    let opt = PortfolioOptimizer::default();
    let frontier = opt.efficient_frontier(&stats).unwrap();
    let targets = opt.frontier_targets(&stats, None);

    assert_eq!(frontier.len(), 30);
    assert_abs_diff_eq!(targets[0], 0.05, epsilon = 1e-15);
    assert_eq!(*targets.last().unwrap(), 0.12);
    for (point, target) in frontier.iter().zip(targets.iter()) {
      assert_valid(point);
      assert_abs_diff_eq!(point.expected_return, *target, epsilon = 1e-9);
    }
  }

  #[test]
  fn min_variance_is_below_every_frontier_point() {
    let stats = four_assets();
    let opt = PortfolioOptimizer::default();
    let gmv = opt.min_variance(&stats).unwrap();

    for range in [FrontierRange::Full, FrontierRange::Efficient] {
      let opt = PortfolioOptimizer::new(OptimizerConfig {
        frontier_range: range,
        ..OptimizerConfig::default()
      });
      for point in &opt.efficient_frontier(&stats).unwrap() {
        assert!(gmv.variance <= point.variance + 1e-12);
      }
    }
  }

  #[test]
  fn efficient_range_starts_at_min_variance_return() {
    let stats = four_assets();
    let opt = PortfolioOptimizer::new(OptimizerConfig {
      frontier_range: FrontierRange::Efficient,
      frontier_points: 10,
      ..OptimizerConfig::default()
    });
    let gmv = opt.min_variance(&stats).unwrap();
    let frontier = opt.efficient_frontier(&stats).unwrap();

    assert_eq!(frontier.len(), 10);
    assert_abs_diff_eq!(frontier.points[0].expected_return, gmv.expected_return, epsilon = 1e-9);
    assert_abs_diff_eq!(frontier.points[0].variance, gmv.variance, epsilon = 1e-10);
    let vols = frontier.volatilities();
    assert!(vols.windows(2).all(|w| w[1] >= w[0] - 1e-12));
  }

  #[test]
  fn frontier_endpoints_hold_extreme_assets() {
    let stats = four_assets();
    let opt = PortfolioOptimizer::default();
    let top = opt.min_variance_for_target(&stats, 0.12).unwrap();
    let bottom = opt.min_variance_for_target(&stats, 0.05).unwrap();

    assert_abs_diff_eq!(top.weights[2], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(bottom.weights[0], 1.0, epsilon = 1e-12);
  }

  #[test]
  fn target_above_maximum_is_infeasible() {
    let err = PortfolioOptimizer::default()
      .min_variance_for_target(&two_assets(), 0.15)
      .unwrap_err();

    match err {
      PortfolioError::InfeasibleTarget { target, min, max } => {
        assert_eq!(target, 0.15);
        assert_eq!(min, 0.08);
        assert_eq!(max, 0.12);
      }
      other => panic!("unexpected error {other:?}"),
    }
  }

  #[test]
  fn clamped_target_is_feasible() {
    let stats = two_assets();
    let target = clamp_target(&stats, 0.15);
    let p = PortfolioOptimizer::default()
      .min_variance_for_target(&stats, target)
      .unwrap();
    assert_abs_diff_eq!(p.expected_return, 0.12, epsilon = 1e-12);
  }

  #[test]
  fn target_below_minimum_is_infeasible() {
    let err = PortfolioOptimizer::default()
      .min_variance_for_target(&two_assets(), 0.05)
      .unwrap_err();
    assert!(matches!(
      err,
      PortfolioError::InfeasibleTarget { target, min, max } if target == 0.05 && min == 0.08 && max == 0.12
    ));
  }

  #[test]
  fn clamping_up_reaches_lowest_mean_asset() {
    let stats = two_assets();
    let target = clamp_target(&stats, 0.05);
    assert_eq!(target, 0.08);

    let p = PortfolioOptimizer::default()
      .min_variance_for_target(&stats, target)
      .unwrap();
    assert_abs_diff_eq!(p.expected_return, 0.08, epsilon = 1e-12);
    assert_eq!(p.weights, vec![1.0, 0.0]);
  }

  #[test]
  fn in_range_target_is_left_alone() {
    assert_eq!(clamp_target(&two_assets(), 0.1), 0.1);
  }

  #[test]
  fn non_finite_risk_free_is_invalid_input() {
    let opt = PortfolioOptimizer::new(OptimizerConfig {
      risk_free: f64::NAN,
      ..OptimizerConfig::default()
    });
    let stats = four_assets();

    assert!(matches!(opt.max_sharpe(&stats), Err(PortfolioError::InvalidInput(_))));
    assert!(matches!(opt.min_variance(&stats), Err(PortfolioError::InvalidInput(_))));
    assert!(matches!(opt.efficient_frontier(&stats), Err(PortfolioError::InvalidInput(_))));
  }

  #[test]
  fn non_positive_tolerance_is_invalid_input() {
    for tolerance in [0.0, -1e-9, f64::INFINITY] {
      let opt = PortfolioOptimizer::new(OptimizerConfig {
        tolerance,
        ..OptimizerConfig::default()
      });
      assert!(matches!(
        opt.min_variance_for_target(&two_assets(), 0.1),
        Err(PortfolioError::InvalidInput(_))
      ));
    }
  }

  #[test]
  fn near_duplicate_assets_solve() {
    // first two assets differ by 1e-9 in covariance
    let e = 1e-9;
    let stats = ReturnStatistics::new(
      vec!["A".into(), "A2".into(), "B".into()],
      vec![0.08, 0.0801, 0.12],
      vec![
        vec![0.04, 0.04 - e, 0.01],
        vec![0.04 - e, 0.04, 0.01],
        vec![0.01, 0.01, 0.09],
      ],
    )
    .unwrap();
    assert!(stats.ensure_positive_definite().is_ok());

    let opt = PortfolioOptimizer::default();
    let gmv = opt.min_variance(&stats).unwrap();
    assert_valid(&gmv);
    // the pair behaves like one asset: w = 0.08 / 0.11 and variance 0.0035 / 0.11
    assert_abs_diff_eq!(gmv.weights[0] + gmv.weights[1], 0.08 / 0.11, epsilon = 1e-6);
    assert_abs_diff_eq!(gmv.variance, 0.0035 / 0.11, epsilon = 1e-8);

    assert_valid(&opt.max_sharpe(&stats).unwrap());
    for p in &opt.efficient_frontier(&stats).unwrap() {
      assert_valid(p);
      assert!(gmv.variance <= p.variance + 1e-12);
    }
  }

  #[test]
  fn too_few_observations_is_singular_covariance() {
    let series = vec![
      AssetReturnSeries::from_returns("A", vec![0.010, -0.004, 0.007]),
      AssetReturnSeries::from_returns("B", vec![0.002, 0.011, -0.006]),
      AssetReturnSeries::from_returns("C", vec![-0.005, 0.003, 0.009]),
      AssetReturnSeries::from_returns("D", vec![0.004, 0.001, -0.002]),
    ];
    let stats = ReturnStatistics::from_series(&series).unwrap();
    let opt = PortfolioOptimizer::default();

    for result in [
      opt.min_variance(&stats),
      opt.max_sharpe(&stats),
      opt.min_variance_for_target(&stats, stats.mean()[0]),
    ] {
      assert!(matches!(result, Err(PortfolioError::SingularCovariance { .. })));
    }
    assert!(matches!(
      opt.efficient_frontier(&stats),
      Err(PortfolioError::SingularCovariance { .. })
    ));
  }

  #[test]
  fn repeated_calls_are_identical() {
    let stats = four_assets();
    let opt = PortfolioOptimizer::default();

    assert_eq!(opt.max_sharpe(&stats).unwrap(), opt.max_sharpe(&stats).unwrap());
    assert_eq!(opt.min_variance(&stats).unwrap(), opt.min_variance(&stats).unwrap());
    assert_eq!(
      opt.efficient_frontier(&stats).unwrap(),
      opt.efficient_frontier(&stats).unwrap()
    );
  }

  #[test]
  fn equal_means_collapse_frontier_to_one_point() {
    let stats = ReturnStatistics::new(
      vec!["A".into(), "B".into()],
      vec![0.1, 0.1],
      vec![vec![0.04, 0.0], vec![0.0, 0.04]],
    )
    .unwrap();
    let opt = PortfolioOptimizer::default();
    let frontier = opt.efficient_frontier(&stats).unwrap();

    assert_eq!(frontier.len(), 1);
    assert_abs_diff_eq!(frontier.points[0].weights[0], 0.5, epsilon = 1e-9);
  }

  #[test]
  fn single_asset_is_fully_invested() {
    let stats = ReturnStatistics::new(vec!["A".into()], vec![0.07], vec![vec![0.03]]).unwrap();
    let opt = PortfolioOptimizer::default();
    assert_eq!(opt.min_variance(&stats).unwrap().weights, vec![1.0]);
    assert_eq!(opt.max_sharpe(&stats).unwrap().weights, vec![1.0]);
  }

  #[test]
  fn max_sharpe_rejects_infeasible_start() {
    let err = PortfolioOptimizer::default().max_sharpe_from(&two_assets(), &[1.5, -0.5]);
    assert!(matches!(err, Err(PortfolioError::InvalidInput(_))));
  }

  #[test]
  fn iteration_budget_surfaces_last_iterate() {
    let opt = PortfolioOptimizer::new(OptimizerConfig {
      max_iters: 1,
      ..OptimizerConfig::default()
    });
    match opt.max_sharpe(&four_assets()) {
      Err(PortfolioError::ConvergenceFailure { last_weights, .. }) => {
        assert_eq!(last_weights.len(), 4);
        assert_abs_diff_eq!(last_weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
      }
      other => panic!("expected convergence failure, got {other:?}"),
    }
  }

  #[traced_test]
  #[test]
  fn frontier_logs_each_point() {
    let opt = PortfolioOptimizer::new(OptimizerConfig {
      frontier_points: 3,
      ..OptimizerConfig::default()
    });
    opt.efficient_frontier(&two_assets()).unwrap();
    assert!(logs_contain("frontier point solved"));
  }

  #[test]
  fn objective_dispatch() {
    let stats = two_assets();
    let opt = PortfolioOptimizer::default();
    assert_eq!(
      opt.optimize(&stats, Objective::MinVariance).unwrap(),
      opt.min_variance(&stats).unwrap()
    );
    let p = opt.optimize(&stats, Objective::TargetReturn(0.1)).unwrap();
    assert_abs_diff_eq!(p.expected_return, 0.1, epsilon = 1e-10);
  }
}
