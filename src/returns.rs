//! # Returns
//!
//! $$
//! r_t = \frac{p_t}{p_{t-1}} - 1,\qquad \hat\Sigma = \frac{1}{T-1}\sum_t (r_t-\bar r)(r_t-\bar r)^\top
//! $$
//!
//! Return series preprocessing and the mean/covariance snapshot consumed by the optimizer.

pub mod series;
pub mod statistics;

pub use series::align_return_series;
pub use series::log_returns;
pub use series::simple_returns;
pub use series::AssetReturnSeries;
pub use series::ReturnKind;
pub use statistics::ReturnStatistics;
pub use statistics::TRADING_DAYS_PER_YEAR;
