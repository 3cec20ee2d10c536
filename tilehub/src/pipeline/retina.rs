use anyhow::{Context, Result};
use tilehub_core::Blob;
use tilehub_image::retina_to_standard;

/// Derives the 256×256 PNG tile from its retina variant off the async runtime.
pub(super) async fn derive_standard(retina: Blob) -> Result<Blob> {
	tokio::task::spawn_blocking(move || retina_to_standard(&retina))
		.await
		.context("retina downscale task failed")?
}
