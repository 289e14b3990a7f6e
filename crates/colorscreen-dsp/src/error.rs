use thiserror::Error;

#[derive(Debug, Error)]
pub enum DspError {
    #[error("deconvolution tile size must be a positive power of two, got {0}")]
    InvalidTileSize(usize),

    #[error("image dimensions {0}x{1} do not match the expected channel-plane size")]
    DimensionMismatch(usize, usize),

    #[error("operation cancelled")]
    Cancelled,
}
