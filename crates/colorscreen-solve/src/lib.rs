//! Nonlinear optimization drivers used for fitting screen geometry and
//! color-correction parameters: a Nelder-Mead simplex search and a
//! Levenberg-Marquardt least-squares solver, both templated over a small
//! problem trait the way the GSL wrapper they are modeled on is
//! templated over a client struct.

mod error;
mod multifit;
mod simplex;

pub use error::SolveError;
pub use multifit::{levenberg_marquardt, MultifitProblem};
pub use simplex::{nelder_mead, SimplexProblem};

/// Iteration cap shared by both solvers, carried over from the original
/// GSL wrapper's `MAX_IT`.
pub const MAX_ITERATIONS: usize = 10_000;
