//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Long-only, fully invested mean-variance optimization.

pub mod objectives;
pub mod optimizer;
pub mod types;

pub use optimizer::clamp_target;
pub use optimizer::FrontierRange;
pub use optimizer::Objective;
pub use optimizer::OptimizerConfig;
pub use optimizer::PortfolioOptimizer;
pub use types::EfficientFrontier;
pub use types::OptimizationReport;
pub use types::Portfolio;
