//! Persistence of layer and style records.

use super::{Layer, StyleRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
	collections::BTreeMap,
	fmt::Debug,
	io::ErrorKind,
	path::{Path, PathBuf},
};
use tokio::sync::RwLock;

#[async_trait]
pub trait LayerStore: Send + Sync + Debug {
	/// All layers, ordered by name.
	async fn get_layers(&self) -> Result<Vec<Layer>>;
	async fn get_layer(&self, name: &str) -> Result<Option<Layer>>;
	/// Inserts or replaces the layer with the same name.
	async fn put_layer(&self, layer: Layer) -> Result<()>;
	/// Removes the layer and its style. Returns `false` if there was no such layer.
	async fn delete_layer(&self, name: &str) -> Result<bool>;
	async fn get_style(&self, layer: &str) -> Result<Option<StyleRecord>>;
	async fn put_style(&self, record: StyleRecord) -> Result<()>;
	/// Returns `false` if the layer had no style.
	async fn delete_style(&self, layer: &str) -> Result<bool>;
}

/// The complete store content, also the on-disk format of [`FileLayerStore`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct StoreDocument {
	#[serde(default)]
	layers: BTreeMap<String, Layer>,
	#[serde(default)]
	styles: BTreeMap<String, Value>,
}

impl StoreDocument {
	fn remove(&mut self, name: &str) -> bool {
		self.styles.remove(name);
		self.layers.remove(name).is_some()
	}

	fn style(&self, layer: &str) -> Option<StyleRecord> {
		self.styles.get(layer).map(|style| StyleRecord {
			layer: layer.to_owned(),
			style: style.clone(),
		})
	}
}

/// Keeps records in memory; they are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryLayerStore {
	document: RwLock<StoreDocument>,
}

impl MemoryLayerStore {
	pub fn new() -> MemoryLayerStore {
		MemoryLayerStore::default()
	}
}

#[async_trait]
impl LayerStore for MemoryLayerStore {
	async fn get_layers(&self) -> Result<Vec<Layer>> {
		Ok(self.document.read().await.layers.values().cloned().collect())
	}

	async fn get_layer(&self, name: &str) -> Result<Option<Layer>> {
		Ok(self.document.read().await.layers.get(name).cloned())
	}

	async fn put_layer(&self, layer: Layer) -> Result<()> {
		self.document.write().await.layers.insert(layer.name.clone(), layer);
		Ok(())
	}

	async fn delete_layer(&self, name: &str) -> Result<bool> {
		Ok(self.document.write().await.remove(name))
	}

	async fn get_style(&self, layer: &str) -> Result<Option<StyleRecord>> {
		Ok(self.document.read().await.style(layer))
	}

	async fn put_style(&self, record: StyleRecord) -> Result<()> {
		self.document.write().await.styles.insert(record.layer, record.style);
		Ok(())
	}

	async fn delete_style(&self, layer: &str) -> Result<bool> {
		Ok(self.document.write().await.styles.remove(layer).is_some())
	}
}

/// Keeps records in a single JSON file that is rewritten on every change.
#[derive(Debug)]
pub struct FileLayerStore {
	path: PathBuf,
	document: RwLock<StoreDocument>,
}

impl FileLayerStore {
	/// Loads the file, or starts empty if it does not exist yet.
	pub async fn open(path: &Path) -> Result<FileLayerStore> {
		let document = match tokio::fs::read(path).await {
			Ok(data) => serde_json::from_slice(&data).with_context(|| format!("parsing layer store {path:?}"))?,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				log::info!("layer store {path:?} does not exist yet, starting empty");
				StoreDocument::default()
			}
			Err(e) => return Err(e).with_context(|| format!("reading layer store {path:?}")),
		};
		Ok(FileLayerStore {
			path: path.to_path_buf(),
			document: RwLock::new(document),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn persist(&self, document: &StoreDocument) -> Result<()> {
		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			tokio::fs::create_dir_all(parent)
				.await
				.with_context(|| format!("creating directory {parent:?}"))?;
		}
		let data = serde_json::to_vec_pretty(document)?;
		tokio::fs::write(&self.path, data)
			.await
			.with_context(|| format!("writing layer store {:?}", self.path))
	}
}

#[async_trait]
impl LayerStore for FileLayerStore {
	async fn get_layers(&self) -> Result<Vec<Layer>> {
		Ok(self.document.read().await.layers.values().cloned().collect())
	}

	async fn get_layer(&self, name: &str) -> Result<Option<Layer>> {
		Ok(self.document.read().await.layers.get(name).cloned())
	}

	async fn put_layer(&self, layer: Layer) -> Result<()> {
		let mut document = self.document.write().await;
		document.layers.insert(layer.name.clone(), layer);
		self.persist(&document).await
	}

	async fn delete_layer(&self, name: &str) -> Result<bool> {
		let mut document = self.document.write().await;
		if !document.remove(name) {
			return Ok(false);
		}
		self.persist(&document).await?;
		Ok(true)
	}

	async fn get_style(&self, layer: &str) -> Result<Option<StyleRecord>> {
		Ok(self.document.read().await.style(layer))
	}

	async fn put_style(&self, record: StyleRecord) -> Result<()> {
		let mut document = self.document.write().await;
		document.styles.insert(record.layer, record.style);
		self.persist(&document).await
	}

	async fn delete_style(&self, layer: &str) -> Result<bool> {
		let mut document = self.document.write().await;
		if document.styles.remove(layer).is_none() {
			return Ok(false);
		}
		self.persist(&document).await?;
		Ok(true)
	}
}
