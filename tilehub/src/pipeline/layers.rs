//! The pipeline variants and how a [`Layer`] is turned into one.

use super::{AssetCache, PipelineContext};
use crate::{
	layer::{Layer, LayerKind, LayerStore, is_valid_source_id},
	sources::MBTilesReader,
	style::first_tile_url,
};
use anyhow::{Context, Result};
use serde_json::Value;
use std::{path::Path, sync::Arc};
use tilehub_core::cache::{CacheOptions, CachePath, DiskCache};

/// Cache of a raster layer.
#[derive(Debug)]
pub struct RasterLayer {
	pub name: String,
	pub cache: DiskCache,
	/// The `@2x` tile is native, the standard tile is derived from it.
	pub retina: bool,
}

/// Independent cache and fetch chain of one sub-source of a vector layer.
#[derive(Debug)]
pub struct VectorSource {
	/// Route name, `{layer}-{id}`.
	pub name: String,
	pub cache: DiskCache,
	/// First upstream tile URL of the sub-source.
	pub template: String,
}

#[derive(Debug)]
pub struct VectorLayer {
	pub name: String,
	/// The rewritten style served at `style.json`.
	pub style: Value,
	pub sources: Vec<Arc<VectorSource>>,
	pub assets: AssetCache,
}

#[derive(Debug)]
pub struct ArchiveLayer {
	pub name: String,
	pub cache: DiskCache,
	/// `None` if the archive does not exist or cannot be opened.
	pub archive: Option<MBTilesReader>,
}

/// How the requests of one layer are answered.
#[derive(Debug)]
pub enum LayerPipeline {
	/// `tiles`: cached files only, a miss is final.
	LocalOnly(RasterLayer),
	/// `proxy`: cached files, misses are fetched from the upstream template.
	Proxy { raster: RasterLayer, template: String },
	/// `proxy` with `vector`: style, sub-sources, glyphs and sprites.
	ProxyVector(VectorLayer),
	/// `mbtiles`: cached files, misses are read from the archive.
	Archive(ArchiveLayer),
}

impl LayerPipeline {
	pub async fn build(layer: &Layer, store: &dyn LayerStore, context: &PipelineContext) -> Result<LayerPipeline> {
		let name = layer.name.clone();
		let pipeline = match (layer.kind, layer.vector) {
			(LayerKind::Tiles, _) => LayerPipeline::LocalOnly(RasterLayer {
				cache: context.tile_cache(&name)?,
				name,
				retina: layer.retina,
			}),
			(LayerKind::Proxy, false) => LayerPipeline::Proxy {
				raster: RasterLayer {
					cache: context.tile_cache(&name)?,
					name,
					retina: layer.retina,
				},
				template: layer
					.source
					.clone()
					.with_context(|| format!("proxy layer '{}' has no source", layer.name))?,
			},
			(LayerKind::Proxy, true) => LayerPipeline::ProxyVector(build_vector(layer, store, context).await?),
			(LayerKind::Mbtiles, _) => LayerPipeline::Archive(ArchiveLayer {
				cache: context.tile_cache(&name)?,
				archive: open_archive(&context.cache.archive_path(&name)),
				name,
			}),
		};
		Ok(pipeline)
	}

	pub fn name(&self) -> &str {
		match self {
			LayerPipeline::LocalOnly(raster) | LayerPipeline::Proxy { raster, .. } => &raster.name,
			LayerPipeline::ProxyVector(vector) => &vector.name,
			LayerPipeline::Archive(archive) => &archive.name,
		}
	}
}

async fn build_vector(layer: &Layer, store: &dyn LayerStore, context: &PipelineContext) -> Result<VectorLayer> {
	let style = match store.get_style(&layer.name).await? {
		Some(record) => record.style,
		None => layer.style.clone().unwrap_or(Value::Null),
	};

	let mut sources = Vec::new();
	for (id, source) in layer.sources.iter().flatten() {
		if !is_valid_source_id(id) {
			log::warn!("vector source '{id}' of layer '{}' has an invalid id, skipping", layer.name);
			continue;
		}
		let name = format!("{}-{id}", layer.name);
		match first_tile_url(source) {
			Some(template) => sources.push(Arc::new(VectorSource {
				cache: context.tile_cache(&name)?,
				template: template.to_owned(),
				name,
			})),
			None => log::warn!("vector source '{id}' of layer '{}' has no tile URL, skipping", layer.name),
		}
	}

	let assets = AssetCache::new(
		&layer.name,
		context.cache_options(CachePath::directory(context.cache.assets_dir(&layer.name))),
		layer.glyphs_source.clone(),
		layer.sprite_source.clone(),
	)?;

	Ok(VectorLayer {
		name: layer.name.clone(),
		style,
		sources,
		assets,
	})
}

fn open_archive(path: &Path) -> Option<MBTilesReader> {
	if !path.exists() {
		log::debug!("archive {path:?} does not exist yet");
		return None;
	}
	match MBTilesReader::open_path(path) {
		Ok(reader) => Some(reader),
		Err(err) => {
			log::warn!("could not open archive {path:?}: {err:#}");
			None
		}
	}
}

impl PipelineContext {
	/// Checks the cache settings without creating anything on disk.
	pub fn validate(&self) -> Result<()> {
		DiskCache::new(self.cache_options(CachePath::directory(self.cache.tiles_path.clone())))
			.map(|_| ())
			.context("invalid cache configuration")
	}

	pub(super) fn cache_options(&self, path: CachePath) -> CacheOptions {
		CacheOptions::new(path)
			.with_maxage(self.cache.maxage())
			.with_refreshage(self.cache.refreshage())
	}

	pub(super) fn tile_cache(&self, name: &str) -> Result<DiskCache> {
		DiskCache::new(self.cache_options(CachePath::directory(self.cache.layer_dir(name))))
			.with_context(|| format!("creating tile cache of '{name}'"))
	}
}
