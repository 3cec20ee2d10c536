pub mod png;

use anyhow::{Context, Result};
use image::{DynamicImage, load_from_memory};
use tilehub_core::Blob;

/// Decodes a raster tile of any supported format (PNG, JPEG, WebP).
pub fn blob2image(blob: &Blob) -> Result<DynamicImage> {
	load_from_memory(blob.as_slice()).with_context(|| format!("decoding raster tile ({} bytes)", blob.len()))
}
