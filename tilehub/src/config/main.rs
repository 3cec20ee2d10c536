use super::{CacheConfig, CorsConfig, ServerConfig, StoreConfig, UpstreamConfig};
use crate::layer::LayerSpec;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
};

#[derive(Default, Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
	/// HTTP server configuration
	#[serde(default)]
	pub server: ServerConfig,

	/// Tile and asset cache directories and freshness windows
	#[serde(default)]
	pub cache: CacheConfig,

	/// Where layer records are persisted
	#[serde(default)]
	pub store: StoreConfig,

	/// HTTP client settings for upstream tile servers
	#[serde(default)]
	pub upstream: UpstreamConfig,

	/// Cross-Origin Resource Sharing (CORS) settings
	#[serde(default)]
	pub cors: CorsConfig,

	/// Layers added when the layer store is empty
	#[serde(default)]
	pub layers: Vec<LayerSpec>,
}

impl Config {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		Ok(serde_yaml_ng::from_reader(reader)?)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	/// Parses a file and resolves relative paths against the file's directory.
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("opening config file {path:?}"))?;
		let mut config =
			Config::from_reader(BufReader::new(file)).with_context(|| format!("parsing config file {path:?}"))?;

		let base = path.parent().unwrap_or_else(|| Path::new("."));
		config.resolve_paths(base);
		Ok(config)
	}

	pub fn resolve_paths(&mut self, base: &Path) {
		self.cache.resolve_paths(base);
		self.store.resolve_paths(base);
	}
}
