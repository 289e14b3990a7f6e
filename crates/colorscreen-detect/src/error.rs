use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("no seed patch found in the initial search grid")]
    NoSeedFound,

    #[error("detected lattice covers only {coverage:.1}% of its expected area, below the {required:.1}% quality gate")]
    InsufficientCoverage { coverage: f64, required: f64 },

    #[error("detection cancelled")]
    Cancelled,
}
