//! Parsing of the `{z}/{x}/{y}[@2x].{ext}` tail of tile URLs.

use super::TileCoord;
use std::fmt::{self, Display};

/// Pixel-density variant of a raster tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileVariant {
	/// The 1x tile, 256 px wide.
	Standard,
	/// The 2x (retina) tile, 512 px wide.
	Retina,
}

impl TileVariant {
	/// Filename suffix placed between the row index and the extension.
	#[must_use]
	pub fn suffix(&self) -> &'static str {
		match self {
			TileVariant::Standard => "",
			TileVariant::Retina => "@2x",
		}
	}
}

/// A fully parsed tile request tail: coordinate, variant and file extension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileAddress {
	pub coord: TileCoord,
	pub variant: TileVariant,
	pub extension: String,
}

impl TileAddress {
	#[must_use]
	pub fn new(coord: TileCoord, variant: TileVariant, extension: &str) -> TileAddress {
		TileAddress {
			coord,
			variant,
			extension: extension.to_owned(),
		}
	}

	/// Parses the three trailing URL segments, e.g. `("3", "4", "5@2x.png")`.
	///
	/// Returns `None` for anything that is not a valid tile address.
	#[must_use]
	pub fn parse(z: &str, x: &str, file: &str) -> Option<TileAddress> {
		let (stem, extension) = file.split_once('.')?;
		if extension.is_empty() || extension.contains('.') {
			return None;
		}
		let (y, variant) = match stem.strip_suffix("@2x") {
			Some(y) => (y, TileVariant::Retina),
			None => (stem, TileVariant::Standard),
		};
		if !is_digits(z) || !is_digits(x) || !is_digits(y) {
			return None;
		}
		let coord = TileCoord::new(z.parse().ok()?, x.parse().ok()?, y.parse().ok()?).ok()?;
		Some(TileAddress {
			coord,
			variant,
			extension: extension.to_owned(),
		})
	}

	/// The cache filename of the tile row: `{y}[@2x].{ext}`.
	#[must_use]
	pub fn filename(&self) -> String {
		format!("{}{}.{}", self.coord.y, self.variant.suffix(), self.extension)
	}

	/// The same coordinate in another variant.
	#[must_use]
	pub fn with_variant(&self, variant: TileVariant) -> TileAddress {
		TileAddress {
			variant,
			..self.clone()
		}
	}
}

impl Display for TileAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}/{}/{}", self.coord.level, self.coord.x, self.filename())
	}
}

fn is_digits(text: &str) -> bool {
	!text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
