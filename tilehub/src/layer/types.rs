use anyhow::{Result, bail, ensure};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, sync::LazyLock};

static LAYER_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]*$").unwrap());
static SOURCE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Source ids of an upstream style become part of a route and of a cache directory name.
pub fn is_valid_source_id(id: &str) -> bool {
	SOURCE_ID.is_match(id)
}

/// Where the tiles of a layer come from.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
	/// Pre-populated cache directory, nothing is generated.
	Tiles,
	/// Reverse proxy of an upstream tile server (raster) or style (vector).
	Proxy,
	/// Local MBTiles archive.
	Mbtiles,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayerStatus {
	Created,
	Ready,
}

fn default_true() -> bool {
	true
}

fn is_false(value: &bool) -> bool {
	!*value
}

/// A layer as submitted by an administrator or listed in the configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LayerSpec {
	pub name: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(rename = "type")]
	pub kind: LayerKind,
	#[serde(default)]
	pub vector: bool,
	#[serde(default)]
	pub retina: bool,
	/// Upstream tile URL template (raster) or style URL (vector).
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default = "default_true")]
	pub display: bool,
	#[serde(default)]
	pub position: Option<i64>,
	#[serde(default)]
	pub default: bool,
}

impl LayerSpec {
	pub fn new(name: &str, kind: LayerKind, source: Option<&str>) -> LayerSpec {
		LayerSpec {
			name: name.to_owned(),
			label: None,
			kind,
			vector: false,
			retina: false,
			source: source.map(str::to_owned),
			display: true,
			position: None,
			default: false,
		}
	}

	/// Checks the structural rules a layer has to follow before anything is fetched or stored.
	pub fn validate(&self) -> Result<()> {
		ensure!(!self.name.is_empty(), "layer name must not be empty");
		ensure!(
			LAYER_NAME.is_match(&self.name),
			"layer name '{}' may only contain letters, digits, '_' and '-'",
			self.name
		);
		match self.kind {
			LayerKind::Proxy => {
				ensure!(
					self.source.as_deref().is_some_and(|s| !s.trim().is_empty()),
					"proxy layer '{}' needs a source",
					self.name
				);
			}
			LayerKind::Tiles | LayerKind::Mbtiles => {
				if self.vector {
					bail!("layer '{}': only proxy layers can be vector layers", self.name);
				}
			}
		}
		if self.vector && self.retina {
			bail!("layer '{}': vector layers have no retina variant", self.name);
		}
		if self.kind == LayerKind::Mbtiles && self.retina {
			bail!("layer '{}': mbtiles layers have no retina variant", self.name);
		}
		Ok(())
	}
}

/// A persisted layer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(rename = "type")]
	pub kind: LayerKind,
	#[serde(default)]
	pub vector: bool,
	#[serde(default)]
	pub retina: bool,
	pub status: LayerStatus,
	#[serde(default = "default_true")]
	pub display: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub position: Option<i64>,
	#[serde(default, skip_serializing_if = "is_false")]
	pub default: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
	/// This server's URL of the layer.
	pub public_source: String,
	/// Upstream source definitions of a vector layer, keyed by source id.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sources: Option<BTreeMap<String, Value>>,
	/// Rewritten style of a vector layer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub style: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub glyphs_source: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sprite_source: Option<String>,
}

impl Layer {
	/// Builds a non-vector layer from a validated spec.
	pub fn from_spec(spec: &LayerSpec, public_source: String, status: LayerStatus) -> Layer {
		Layer {
			name: spec.name.clone(),
			label: spec.label.clone(),
			kind: spec.kind,
			vector: spec.vector,
			retina: spec.retina,
			status,
			display: spec.display,
			position: spec.position,
			default: spec.default,
			source: spec.source.clone(),
			public_source,
			sources: None,
			style: None,
			glyphs_source: None,
			sprite_source: None,
		}
	}

	/// Route names of the vector sub-sources, `{layer}-{id}`. Ids that are not route-safe are left out.
	pub fn vector_source_names(&self) -> Vec<String> {
		self
			.sources
			.iter()
			.flat_map(|sources| sources.keys())
			.filter(|id| is_valid_source_id(id))
			.map(|id| format!("{}-{id}", self.name))
			.collect()
	}

	/// Every route name this layer answers: its own name and those of its vector sub-sources.
	pub fn route_names(&self) -> Vec<String> {
		let mut names = vec![self.name.clone()];
		names.extend(self.vector_source_names());
		names
	}
}

/// The rewritten style of a vector layer, as served at `/maps/{layer}/style.json`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StyleRecord {
	pub layer: String,
	pub style: Value,
}
