use crate::{TileAddress, TileCoord, TileVariant};
use std::fmt::{self, Display};

/// Describes one cacheable artifact. The cache path is derived from these fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheRequest {
	/// A raster or vector tile of a layer (or of a layer's vector sub-source).
	Tile { layer: String, address: TileAddress },
	/// A glyph range of a font stack, e.g. `Open Sans Regular` / `0-255`.
	Glyphs {
		layer: String,
		fontstack: String,
		range: String,
	},
	/// A sprite file, where `filename` is what follows the layer name in the URL,
	/// e.g. `.json` or `@2x.png`.
	Sprite { layer: String, filename: String },
}

impl CacheRequest {
	pub fn tile(layer: &str, address: &TileAddress) -> CacheRequest {
		CacheRequest::Tile {
			layer: layer.to_owned(),
			address: address.clone(),
		}
	}

	pub fn glyphs(layer: &str, fontstack: &str, range: &str) -> CacheRequest {
		CacheRequest::Glyphs {
			layer: layer.to_owned(),
			fontstack: fontstack.to_owned(),
			range: range.to_owned(),
		}
	}

	pub fn sprite(layer: &str, filename: &str) -> CacheRequest {
		CacheRequest::Sprite {
			layer: layer.to_owned(),
			filename: filename.to_owned(),
		}
	}

	/// The value substituted for `{type}` in path templates.
	pub fn kind(&self) -> &'static str {
		match self {
			CacheRequest::Tile { .. } => "tile",
			CacheRequest::Glyphs { .. } => "glyphs",
			CacheRequest::Sprite { .. } => "sprite",
		}
	}

	pub fn layer(&self) -> &str {
		match self {
			CacheRequest::Tile { layer, .. } | CacheRequest::Glyphs { layer, .. } | CacheRequest::Sprite { layer, .. } => {
				layer
			}
		}
	}

	/// The value substituted for `{filename}` in path templates.
	pub fn filename(&self) -> String {
		match self {
			CacheRequest::Tile { address, .. } => address.filename(),
			CacheRequest::Glyphs { range, .. } => format!("{range}.pbf"),
			CacheRequest::Sprite { filename, .. } => filename.clone(),
		}
	}

	pub fn coord(&self) -> Option<&TileCoord> {
		match self {
			CacheRequest::Tile { address, .. } => Some(&address.coord),
			_ => None,
		}
	}

	pub fn variant(&self) -> Option<TileVariant> {
		match self {
			CacheRequest::Tile { address, .. } => Some(address.variant),
			_ => None,
		}
	}
}

impl Display for CacheRequest {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			CacheRequest::Tile { layer, address } => write!(f, "tile {layer}/{address}"),
			CacheRequest::Glyphs {
				layer,
				fontstack,
				range,
			} => write!(f, "glyphs {layer}/{fontstack}/{range}"),
			CacheRequest::Sprite { layer, filename } => write!(f, "sprite {layer}{filename}"),
		}
	}
}
