//! Signal-processing core: the tabulated/analytic MTF model used to size
//! and build deconvolution kernels, and the tiled FFT deconvolution
//! engine itself (Wiener sharpening, Richardson-Lucy, plain blur).

mod deconv;
mod error;
mod mtf;

pub use deconv::{Deconvolution, DeconvolutionMode};
pub use error::DspError;
pub use mtf::{Mtf, MtfModel};
