use anyhow::{Result, bail};
use image::{
	DynamicImage, ImageEncoder,
	codecs::png::{CompressionType, FilterType, PngEncoder},
};
use tilehub_core::Blob;

/// Encodes an 8-bit image as PNG.
pub fn image2blob(image: &DynamicImage) -> Result<Blob> {
	if image.color().bytes_per_pixel() / image.color().channel_count() != 1 {
		bail!("png encoding only supports 8-bit images");
	}

	let mut buffer: Vec<u8> = Vec::new();
	PngEncoder::new_with_quality(&mut buffer, CompressionType::Default, FilterType::Adaptive).write_image(
		image.as_bytes(),
		image.width(),
		image.height(),
		image.color().into(),
	)?;

	Ok(Blob::from(buffer))
}
