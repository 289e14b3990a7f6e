//! Lookup-table based nonlinear functions used throughout the coordinate
//! pipeline: a general piecewise-linear 1D function, and the radial
//! lens-warp correction built on top of it.

mod lens_warp;
mod precomputed_function;

pub use lens_warp::LensWarp;
pub use precomputed_function::PrecomputedFunction;
