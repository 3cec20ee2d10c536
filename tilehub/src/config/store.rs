use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
	/// JSON file holding layer and style records. Without it, records live in memory only.
	pub path: Option<PathBuf>,
}

impl StoreConfig {
	pub fn resolve_paths(&mut self, base: &Path) {
		if let Some(path) = &self.path {
			self.path = Some(base.join(path));
		}
	}
}
