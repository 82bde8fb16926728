//! # Portfolio Engine
//!
//! $$
//! \text{prices}\ \to\ r_t\ \to\ (\mu, \Sigma)\ \to\ \{\mathbf{w}_{\min\sigma},\ \mathbf{w}_{\max S},\ \text{frontier}\}
//! $$
//!
//! High-level orchestration from a market data source to an [`OptimizationReport`].

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use chrono::NaiveDate;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::market::MarketDataSource;
use crate::market::PriceObservation;
use crate::portfolio::OptimizationReport;
use crate::portfolio::OptimizerConfig;
use crate::portfolio::Portfolio;
use crate::portfolio::PortfolioOptimizer;
use crate::returns::AssetReturnSeries;
use crate::returns::ReturnKind;
use crate::returns::ReturnStatistics;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug)]
pub struct PortfolioEngineConfig {
  /// Optimizer settings. `risk_free` must be quoted per period of the statistics.
  pub optimizer: OptimizerConfig,
  /// Price to return conversion.
  pub return_kind: ReturnKind,
  /// Annualize statistics with this many periods per year.
  pub periods_per_year: Option<f64>,
  /// How long memoized statistics stay valid. `None` disables memoization.
  pub cache_ttl: Option<Duration>,
  /// Retry a non-converged max-Sharpe solve from other starting portfolios.
  pub sharpe_restarts: bool,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      optimizer: OptimizerConfig::default(),
      return_kind: ReturnKind::Simple,
      periods_per_year: None,
      cache_ttl: Some(Duration::from_secs(300)),
      sharpe_restarts: true,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
  symbols: Vec<String>,
  start: NaiveDate,
  end: NaiveDate,
}

struct CachedStatistics {
  stats: ReturnStatistics,
  computed_at: Instant,
}

/// Single entry-point from market data to optimized portfolios.
pub struct PortfolioEngine<S> {
  source: S,
  config: PortfolioEngineConfig,
  optimizer: PortfolioOptimizer,
  cache: HashMap<CacheKey, CachedStatistics>,
}

impl<S: MarketDataSource> PortfolioEngine<S> {
  pub fn new(source: S, config: PortfolioEngineConfig) -> Self {
    let optimizer = PortfolioOptimizer::new(config.optimizer.clone());
    Self {
      source,
      config,
      optimizer,
      cache: HashMap::new(),
    }
  }

  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  pub fn optimizer(&self) -> &PortfolioOptimizer {
    &self.optimizer
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Drop every memoized statistics snapshot.
  pub fn clear_cache(&mut self) {
    self.cache.clear();
  }

  /// Fetch, align and summarize returns for `symbols` over `[start, end]`.
  pub fn statistics(
    &mut self,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<ReturnStatistics> {
    if symbols.is_empty() {
      return Err(PortfolioError::InsufficientData { required: 1, got: 0 });
    }

    let key = CacheKey {
      symbols: symbols.iter().map(|s| s.to_string()).collect(),
      start,
      end,
    };

    if let (Some(ttl), Some(entry)) = (self.config.cache_ttl, self.cache.get(&key)) {
      if entry.computed_at.elapsed() <= ttl {
        tracing::debug!(symbols = ?key.symbols, %start, %end, "statistics served from cache");
        return Ok(entry.stats.clone());
      }
      tracing::warn!(symbols = ?key.symbols, %start, %end, "cached statistics are stale, refetching");
    }

    let mut histories = Vec::with_capacity(symbols.len());
    for symbol in symbols {
      let prices = self.source.fetch_prices(symbol, start, end)?;
      tracing::debug!(symbol, observations = prices.len(), "prices fetched");
      histories.push(prices);
    }

    let aligned = align_prices(&histories);
    let series = symbols
      .iter()
      .zip(aligned.iter())
      .map(|(symbol, prices)| AssetReturnSeries::from_prices(symbol, prices, self.config.return_kind))
      .collect::<Result<Vec<_>>>()?;

    let mut stats = ReturnStatistics::from_series(&series)?;
    if let Some(k) = self.config.periods_per_year {
      stats = stats.annualized(k);
    }

    if let Some(ttl) = self.config.cache_ttl {
      self.cache.retain(|_, entry| entry.computed_at.elapsed() <= ttl);
      self.cache.insert(
        key,
        CachedStatistics {
          stats: stats.clone(),
          computed_at: Instant::now(),
        },
      );
    }

    Ok(stats)
  }

  /// Fetch data and compute the full optimization report.
  pub fn optimize(
    &mut self,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<OptimizationReport> {
    let stats = self.statistics(symbols, start, end)?;
    self.optimize_statistics(&stats)
  }

  /// Compute the full optimization report for precomputed statistics.
  pub fn optimize_statistics(&self, stats: &ReturnStatistics) -> Result<OptimizationReport> {
    tracing::info!(
      assets = stats.n_assets(),
      observations = ?stats.observations(),
      "optimizing portfolio"
    );

    let min_variance = self.optimizer.min_variance(stats)?;
    let max_sharpe = self.max_sharpe_with_restarts(stats, &min_variance)?;
    let frontier = self.optimizer.efficient_frontier(stats)?;

    Ok(OptimizationReport {
      statistics: stats.clone(),
      risk_free: self.config.optimizer.risk_free,
      min_variance,
      max_sharpe,
      frontier,
    })
  }

  fn max_sharpe_with_restarts(&self, stats: &ReturnStatistics, gmv: &Portfolio) -> Result<Portfolio> {
    let first = match self.optimizer.max_sharpe(stats) {
      Err(err @ PortfolioError::ConvergenceFailure { .. }) if self.config.sharpe_restarts => err,
      other => return other,
    };

    let starts = [gmv.weights.clone(), best_single_asset(stats, self.config.optimizer.risk_free)];
    for (attempt, start) in starts.iter().enumerate() {
      tracing::warn!(attempt = attempt + 1, error = %first, "retrying max-Sharpe solve from another start");
      match self.optimizer.max_sharpe_from(stats, start) {
        Ok(p) => return Ok(p),
        Err(PortfolioError::ConvergenceFailure { .. }) => continue,
        Err(other) => return Err(other),
      }
    }

    Err(first)
  }
}

/// All-in portfolio on the asset with the highest stand-alone Sharpe ratio.
fn best_single_asset(stats: &ReturnStatistics, risk_free: f64) -> Vec<f64> {
  let n = stats.n_assets();
  let vols = stats.volatilities();
  let score = |i: usize| (stats.mean()[i] - risk_free) / vols[i];
  let best = (0..n).fold(0, |best, i| if score(i) > score(best) { i } else { best });

  let mut weights = vec![0.0; n];
  weights[best] = 1.0;
  weights
}

/// Keep only the dates every history shares.
fn align_prices(histories: &[Vec<PriceObservation>]) -> Vec<Vec<PriceObservation>> {
  let mut common: Option<BTreeSet<NaiveDate>> = None;
  for history in histories {
    let dates: BTreeSet<NaiveDate> = history.iter().map(|p| p.date).collect();
    common = Some(match common {
      Some(acc) => acc.intersection(&dates).copied().collect(),
      None => dates,
    });
  }
  let common = common.unwrap_or_default();

  histories
    .iter()
    .map(|h| h.iter().filter(|p| common.contains(&p.date)).copied().collect())
    .collect()
}
