use thiserror::Error;

/// Result alias used throughout the colorscreen crates.
pub type Result<T> = std::result::Result<T, CsError>;

/// Shared error taxonomy for coordinate, geometry and raster failures.
///
/// Higher-level crates define their own error enums for concerns specific
/// to them (parse errors, solve non-convergence, cache exhaustion) and wrap
/// this one with `#[from]` where a lower-level failure can propagate up.
#[derive(Debug, Error)]
pub enum CsError {
    /// A coordinate transform was asked to invert a point outside the
    /// domain it was built for (e.g. outside a mesh's control grid, or
    /// beyond a lens-warp table's precomputed radius).
    #[error("point ({x}, {y}) is outside the domain of this transform")]
    OutOfDomain { x: f64, y: f64 },

    /// A lookup table (precomputed function, mesh, MTF table) was queried
    /// before being built, or was built from a degenerate input (fewer
    /// than two control points, zero-area mesh cell).
    #[error("{0} is empty or was never precomputed")]
    NotPrecomputed(&'static str),

    /// A raster dimension or index fell outside the bounds of the buffer,
    /// or an arithmetic size computation (width * height * channels)
    /// would overflow.
    #[error("raster bounds error: {0}")]
    RasterBounds(String),

    /// The long-running operation was cancelled cooperatively via
    /// `colorscreen_progress`.
    #[error("operation cancelled")]
    Cancelled,
}
