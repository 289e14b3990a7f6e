use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("malformed backlight correction data: {0}")]
    MalformedBacklight(String),

    #[error("expected keyword {expected:?} at offset {offset}, found {found:?}")]
    UnexpectedLccKeyword {
        expected: &'static str,
        found: String,
        offset: usize,
    },

    #[error("LCC file ended before the expected data block")]
    TruncatedLcc,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
