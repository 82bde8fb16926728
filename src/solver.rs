//! # Solvers
//!
//! $$
//! \min_{\mathbf{x}} f(\mathbf{x})\quad\text{s.t.}\quad A\mathbf{x}=\mathbf{b},\ \mathbf{x}\ge 0
//! $$
//!
//! Sequential quadratic programming over the non-negative orthant with linear
//! equality constraints, backed by a primal active-set QP solver.

pub mod qp;
pub mod sqp;

pub use qp::ActiveSetQp;
pub use qp::QpSolution;
pub use sqp::HessianUpdate;
pub use sqp::Sqp;
pub use sqp::SqpOutcome;
