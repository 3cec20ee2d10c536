//! Derivation of a standard tile from its 2x (retina) variant.

use crate::format::{blob2image, png};
use anyhow::{Context, Result, ensure};
use fast_image_resize::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use image::DynamicImage;
use tilehub_core::Blob;

/// Edge length of a standard raster tile.
pub const TILE_SIZE: u32 = 256;

/// Resizes a raster tile to `size`×`size` pixels and returns it as PNG.
///
/// The source may be any decodable format. It is normalised to RGBA before resizing.
pub fn downscale_tile(blob: &Blob, size: u32) -> Result<Blob> {
	ensure!(size > 0, "target tile size must be greater than zero");

	let source = DynamicImage::ImageRgba8(blob2image(blob)?.into_rgba8());
	let mut target = DynamicImage::new_rgba8(size, size);
	Resizer::new()
		.resize(
			&source,
			&mut target,
			&ResizeOptions::default().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)),
		)
		.with_context(|| format!("resizing {}x{} to {size}x{size}", source.width(), source.height()))?;

	log::trace!("downscaled {}x{} tile to {size}x{size}", source.width(), source.height());
	png::image2blob(&target)
}

/// Derives the standard tile from a retina tile.
pub fn retina_to_standard(blob: &Blob) -> Result<Blob> {
	downscale_tile(blob, TILE_SIZE)
}
