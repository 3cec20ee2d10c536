//! Glyph and sprite cache of a vector layer.

use super::{RefreshHook, cached::cached};
use crate::sources::{SourceResponse, Upstream};
use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tilehub_core::cache::{CacheOptions, CacheRequest, DiskCache};

/// Characters escaped in a fontstack, the same set `encodeURIComponent` escapes.
const FONTSTACK: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

#[derive(Debug)]
pub struct AssetCache {
	layer: String,
	cache: DiskCache,
	glyphs_source: Option<String>,
	sprite_source: Option<String>,
}

impl AssetCache {
	pub fn new(
		layer: &str,
		options: CacheOptions,
		glyphs_source: Option<String>,
		sprite_source: Option<String>,
	) -> Result<AssetCache> {
		Ok(AssetCache {
			layer: layer.to_owned(),
			cache: DiskCache::new(options).with_context(|| format!("creating asset cache of layer '{layer}'"))?,
			glyphs_source,
			sprite_source,
		})
	}

	/// Upstream URL of a glyph range.
	pub fn glyphs_url(&self, fontstack: &str, range: &str) -> Option<String> {
		let template = self.glyphs_source.as_ref()?;
		let fontstack = utf8_percent_encode(fontstack, FONTSTACK).to_string();
		Some(
			template
				.replace("{layer}", &self.layer)
				.replace("{fontstack}", &fontstack)
				.replace("{range}", range),
		)
	}

	/// Upstream URL of a sprite file, the filename appended to the sprite base URL.
	pub fn sprite_url(&self, filename: &str) -> Option<String> {
		Some(format!("{}{filename}", self.sprite_source.as_ref()?))
	}

	pub async fn glyphs(
		&self,
		upstream: &Upstream,
		hook: &dyn RefreshHook,
		fontstack: &str,
		range: &str,
	) -> Result<Option<SourceResponse>> {
		let request = CacheRequest::glyphs(&self.layer, fontstack, range);
		let url = self.glyphs_url(fontstack, range);
		let blob = cached(&self.cache, &request, hook, || fetch(upstream, url)).await?;
		Ok(blob.map(|blob| SourceResponse::new(blob, "application/x-protobuf")))
	}

	pub async fn sprite(
		&self,
		upstream: &Upstream,
		hook: &dyn RefreshHook,
		filename: &str,
	) -> Result<Option<SourceResponse>> {
		let request = CacheRequest::sprite(&self.layer, filename);
		let url = self.sprite_url(filename);
		let blob = cached(&self.cache, &request, hook, || fetch(upstream, url)).await?;
		let mime = mime_guess::from_path(filename).first_or_octet_stream();
		Ok(blob.map(|blob| SourceResponse::new(blob, mime.essence_str())))
	}
}

async fn fetch(upstream: &Upstream, url: Option<String>) -> Result<Option<tilehub_core::Blob>> {
	match url {
		Some(url) => Ok(Some(upstream.fetch(&url).await?.decompressed()?)),
		None => Ok(None),
	}
}
