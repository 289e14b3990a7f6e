//! Tiled, cache-backed rendering of a reconstructed color image from a
//! raw scan, a detected/known screen geometry, and the screen-mosaic
//! model — the component that ties together geometry, screen synthesis,
//! deconvolution, corrections and detection into pixels.

mod render_type;
mod renderer;
mod stitch;

pub use render_type::RenderType;
pub use renderer::{RenderError, Renderer, TileRequest};
pub use stitch::StitchProject;
