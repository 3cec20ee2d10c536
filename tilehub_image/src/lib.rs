//! Raster operations on tiles: decoding, PNG encoding and the retina downscale.

pub mod format;

mod retina;
pub use retina::*;
