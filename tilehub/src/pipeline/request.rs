use std::fmt::{self, Display};
use tilehub_core::TileAddress;

/// A public request, already split into its parts by the HTTP layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapRequest {
	/// `/maps/{name}/{z}/{x}/{file}`, where `name` is a layer or a vector sub-source `{layer}-{id}`.
	Tile { name: String, address: TileAddress },
	/// `/maps/{layer}/style.json`
	Style { layer: String },
	/// `/glyphs/{layer}/{fontstack}/{range}.pbf`
	Glyphs {
		layer: String,
		fontstack: String,
		range: String,
	},
	/// `/sprites/{layer}{filename}`
	Sprite { layer: String, filename: String },
}

impl Display for MapRequest {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			MapRequest::Tile { name, address } => write!(f, "tile {name}/{address}"),
			MapRequest::Style { layer } => write!(f, "style {layer}"),
			MapRequest::Glyphs {
				layer,
				fontstack,
				range,
			} => write!(f, "glyphs {layer}/{fontstack}/{range}"),
			MapRequest::Sprite { layer, filename } => write!(f, "sprite {layer}{filename}"),
		}
	}
}
