//! Tile coordinates in a Web Mercator pyramid.
//!
//! ```
//! use tilehub_core::TileCoord;
//!
//! let coord = TileCoord::new(3, 1, 2).unwrap();
//! assert_eq!(coord.tms_y(), 5);
//! assert!(TileCoord::new(3, 8, 0).is_err());
//! ```

use anyhow::{Result, ensure};
use std::fmt::{self, Debug, Display};

/// A tile coordinate with zoom level and x/y indices (XYZ addressing, y grows southwards).
#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	/// The zoom level of the tile.
	pub level: u8,
	/// The x index of the tile.
	pub x: u32,
	/// The y index of the tile.
	pub y: u32,
}

impl TileCoord {
	/// Create a new `TileCoord`.
	///
	/// # Errors
	/// Returns an error if `level` > 31 or `x`/`y` are outside the level's range.
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		let max = 1u64 << level;
		ensure!(u64::from(x) < max, "x ({x}) out of bounds for level {level}");
		ensure!(u64::from(y) < max, "y ({y}) out of bounds for level {level}");
		Ok(TileCoord { level, x, y })
	}

	/// The row index in TMS addressing (y grows northwards), as used by MBTiles.
	#[must_use]
	pub fn tms_y(&self) -> u32 {
		((1u64 << self.level) - 1 - u64::from(self.y)) as u32
	}

	/// Substitutes `{z}`, `{x}` and `{y}` in a URL template.
	#[must_use]
	pub fn fill_template(&self, template: &str) -> String {
		template
			.replace("{z}", &self.level.to_string())
			.replace("{x}", &self.x.to_string())
			.replace("{y}", &self.y.to_string())
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "TileCoord({}, [{}, {}])", self.level, self.x, self.y)
	}
}

impl Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}/{}/{}", self.level, self.x, self.y)
	}
}
