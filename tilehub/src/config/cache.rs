use serde::Deserialize;
use std::{
	path::{Path, PathBuf},
	time::Duration,
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
	/// Directory of cached tiles and of `{layer}.mbtiles` archives.
	#[serde(default = "default_tiles_path")]
	pub tiles_path: PathBuf,

	/// Directory of cached glyphs and sprites.
	#[serde(default = "default_assets_path")]
	pub assets_path: PathBuf,

	/// Age in seconds after which a cached file is ignored. Unset keeps files forever,
	/// `0` disables caching.
	pub maxage_seconds: Option<u64>,

	/// Age in seconds after which a cached file is flagged for refresh. Requires `maxage_seconds`.
	pub refreshage_seconds: Option<u64>,
}

fn default_tiles_path() -> PathBuf {
	PathBuf::from("tiles")
}

fn default_assets_path() -> PathBuf {
	PathBuf::from("assets")
}

impl Default for CacheConfig {
	fn default() -> Self {
		CacheConfig {
			tiles_path: default_tiles_path(),
			assets_path: default_assets_path(),
			maxage_seconds: None,
			refreshage_seconds: None,
		}
	}
}

impl CacheConfig {
	pub fn maxage(&self) -> Option<Duration> {
		self.maxage_seconds.map(Duration::from_secs)
	}

	pub fn refreshage(&self) -> Option<Duration> {
		self.refreshage_seconds.map(Duration::from_secs)
	}

	/// Cache directory of a layer, or of a vector sub-source route `{layer}-{id}`.
	pub fn layer_dir(&self, name: &str) -> PathBuf {
		self.tiles_path.join(name)
	}

	/// Location of the archive of an `mbtiles` layer.
	pub fn archive_path(&self, name: &str) -> PathBuf {
		self.tiles_path.join(format!("{name}.mbtiles"))
	}

	/// Glyph and sprite cache directory of a layer.
	pub fn assets_dir(&self, name: &str) -> PathBuf {
		self.assets_path.join(name)
	}

	pub fn resolve_paths(&mut self, base: &Path) {
		self.tiles_path = base.join(&self.tiles_path);
		self.assets_path = base.join(&self.assets_path);
	}
}
