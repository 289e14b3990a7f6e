//! Coordinate mapping between the screen-mosaic lattice and the scanned
//! image: an affine basis change, an optional perspective term, radial
//! lens-warp correction, an optional scanner motor-speed correction, and
//! an optional dense curvilinear mesh, all composed into one transform.

mod mesh;
mod scr_to_img;

pub use mesh::Mesh;
pub use scr_to_img::{ScrToImg, ScrToImgParams};
