use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    /// The iteration cap was hit without satisfying the epsilon
    /// convergence test on every parameter.
    #[error("solver failed to converge within {0} iterations")]
    NotConverged(usize),

    /// The solve was cancelled cooperatively via `ProgressInfo`.
    #[error("solve cancelled")]
    Cancelled,

    /// A degenerate problem was supplied (zero parameters, zero
    /// residuals, or a non-finite objective value at the start point).
    #[error("invalid problem definition: {0}")]
    InvalidProblem(&'static str),
}
