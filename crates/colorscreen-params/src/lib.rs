//! The line-oriented `.par` parameter-file grammar tying together
//! screen geometry, lens/motor corrections, the presentation transform,
//! solver seed points, and the backlight/scanner-blur correction blocks
//! into one document that round-trips byte-for-byte on resave.

mod document;
mod error;

pub use document::{ParFile, SolverPoint};
pub use error::ParamsError;
