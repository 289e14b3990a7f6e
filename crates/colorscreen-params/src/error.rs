use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("malformed parameter file: {0}")]
    Malformed(String),

    #[error("unknown screen type {0:?}")]
    UnknownScreenType(String),

    #[error(transparent)]
    Correction(#[from] colorscreen_correction::CorrectionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
