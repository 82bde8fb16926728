//! # frontier-rs
//!
//! $$
//! \min_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1}\ \mathbf{w}^\top\Sigma\mathbf{w}
//! \quad\text{s.t.}\quad \mathbf{w}^\top\mu = r^\*
//! $$
//!
//! Long-only mean-variance portfolio optimization: global minimum variance,
//! maximum Sharpe ratio and the efficient frontier, from price histories or
//! from caller-supplied moments.

pub mod engine;
pub mod error;
pub mod market;
pub mod portfolio;
pub mod report;
pub mod returns;
pub mod solver;

pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use error::PortfolioError;
pub use error::Result;
pub use portfolio::EfficientFrontier;
pub use portfolio::Objective;
pub use portfolio::OptimizationReport;
pub use portfolio::OptimizerConfig;
pub use portfolio::Portfolio;
pub use portfolio::PortfolioOptimizer;
pub use returns::ReturnStatistics;
