//! Automatic detection of a regular color-screen mosaic in a raw scan:
//! per-pixel color classification, a seeded coarse-grid search for the
//! lattice spacing and orientation, flood-fill patch confirmation, and
//! quality gates deciding whether the detected lattice is trustworthy
//! enough to use.

mod classify;
mod detector;
mod error;
mod optimize;

pub use classify::classify_color;
pub use detector::{detect_regular_screen, DetectedPatch, DetectionResult, ScrDetectParameters};
pub use error::DetectError;
pub use optimize::optimize_screen_colors;
