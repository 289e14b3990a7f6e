//! Shared types used across the colorscreen reconstruction crates: a 2D
//! point, the closed set of screen/scanner/color-class enums, a generic
//! row-major raster buffer, and the workspace error taxonomy.

mod error;
mod point;
mod raster;
mod screen_type;

pub use error::{CsError, Result};
pub use point::Point;
pub use raster::Raster;
pub use screen_type::{ColorClass, ScannerType, ScreenType};

/// Monotonically increasing id dispenser shared by the cache and detector
/// crates, so that cached entries and discovered patches get process-wide
/// unique identifiers without each crate keeping its own counter type.
pub mod ids {
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    /// Returns a fresh, never-repeated id.
    pub fn next_id() -> u64 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }
}

pub mod prelude {
    pub use crate::{ColorClass, CsError, Point, Raster, Result, ScannerType, ScreenType};
}
