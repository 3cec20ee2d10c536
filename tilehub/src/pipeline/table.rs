use super::{
	ArchiveLayer, LayerPipeline, LogRefreshHook, MapRequest, RasterLayer, RefreshHook, VectorLayer, VectorSource,
	cached::cached, retina::derive_standard,
};
use crate::{
	config::CacheConfig,
	layer::{Layer, LayerStore},
	sources::{SourceResponse, Upstream},
};
use anyhow::{Context, Result, anyhow};
use std::{collections::HashMap, fmt::Debug, sync::Arc};
use tilehub_core::{Blob, TileAddress, TileVariant, cache::CacheRequest};

/// Shared dependencies of all pipelines.
#[derive(Clone, Debug)]
pub struct PipelineContext {
	pub upstream: Upstream,
	pub cache: CacheConfig,
	pub refresh_hook: Arc<dyn RefreshHook>,
}

impl PipelineContext {
	pub fn new(upstream: Upstream, cache: CacheConfig) -> PipelineContext {
		PipelineContext {
			upstream,
			cache,
			refresh_hook: Arc::new(LogRefreshHook),
		}
	}

	#[must_use]
	pub fn with_refresh_hook(mut self, hook: Arc<dyn RefreshHook>) -> PipelineContext {
		self.refresh_hook = hook;
		self
	}
}

/// Immutable snapshot of the pipelines of every layer.
#[derive(Debug)]
pub struct PipelineTable {
	context: PipelineContext,
	layers: HashMap<String, Arc<LayerPipeline>>,
	vector_sources: HashMap<String, Arc<VectorSource>>,
}

impl PipelineTable {
	pub fn empty(context: PipelineContext) -> PipelineTable {
		PipelineTable {
			context,
			layers: HashMap::new(),
			vector_sources: HashMap::new(),
		}
	}

	/// Builds the pipelines of all layers in `store`.
	pub async fn build(store: &dyn LayerStore, context: PipelineContext) -> Result<PipelineTable> {
		let layers = store.get_layers().await.context("loading layers")?;
		PipelineTable::from_layers(&layers, store, context).await
	}

	pub async fn from_layers(layers: &[Layer], store: &dyn LayerStore, context: PipelineContext) -> Result<PipelineTable> {
		let mut table = PipelineTable::empty(context);
		for layer in layers {
			let pipeline = LayerPipeline::build(layer, store, &table.context)
				.await
				.with_context(|| format!("building pipeline of layer '{}'", layer.name))?;
			if let LayerPipeline::ProxyVector(vector) = &pipeline {
				for source in &vector.sources {
					table.vector_sources.insert(source.name.clone(), Arc::clone(source));
				}
			}
			log::debug!("add layer '{}': {}", layer.name, describe(&pipeline));
			table.layers.insert(layer.name.clone(), Arc::new(pipeline));
		}
		Ok(table)
	}

	pub fn layer(&self, name: &str) -> Option<&LayerPipeline> {
		self.layers.get(name).map(AsRef::as_ref)
	}

	pub fn layer_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.layers.keys().cloned().collect();
		names.sort();
		names
	}

	/// Splits `{layer}{filename}` of a sprite URL, preferring the longest layer name that is
	/// followed by `.` or `@`.
	pub fn resolve_sprite(&self, path: &str) -> Option<(String, String)> {
		self
			.layers
			.keys()
			.filter(|name| {
				path
					.strip_prefix(name.as_str())
					.is_some_and(|rest| rest.starts_with('.') || rest.starts_with('@'))
			})
			.max_by_key(|name| name.len())
			.map(|name| (name.clone(), path[name.len()..].to_owned()))
	}

	/// Answers a request. `Ok(None)` means not found.
	pub async fn serve(&self, request: &MapRequest) -> Result<Option<SourceResponse>> {
		match request {
			MapRequest::Tile { name, address } => {
				if let Some(pipeline) = self.layers.get(name) {
					return self.serve_tile(pipeline, address).await;
				}
				match self.vector_sources.get(name) {
					Some(source) => self.vector_tile(source, address).await,
					None => Ok(None),
				}
			}
			MapRequest::Style { layer } => Ok(self.vector_layer(layer).map(|vector| {
				SourceResponse::new(Blob::from(vector.style.to_string()), "application/json")
			})),
			MapRequest::Glyphs {
				layer,
				fontstack,
				range,
			} => {
				let Some(vector) = self.vector_layer(layer) else {
					return Ok(None);
				};
				if !is_safe_segment(fontstack) || !is_glyph_range(range) {
					return Ok(None);
				}
				let context = &self.context;
				vector
					.assets
					.glyphs(&context.upstream, context.refresh_hook.as_ref(), fontstack, range)
					.await
			}
			MapRequest::Sprite { layer, filename } => {
				let Some(vector) = self.vector_layer(layer) else {
					return Ok(None);
				};
				if !(filename.starts_with('.') || filename.starts_with('@')) || !is_safe_segment(filename) {
					return Ok(None);
				}
				let context = &self.context;
				vector
					.assets
					.sprite(&context.upstream, context.refresh_hook.as_ref(), filename)
					.await
			}
		}
	}

	fn vector_layer(&self, name: &str) -> Option<&VectorLayer> {
		match self.layers.get(name)?.as_ref() {
			LayerPipeline::ProxyVector(vector) => Some(vector),
			_ => None,
		}
	}

	async fn serve_tile(&self, pipeline: &LayerPipeline, address: &TileAddress) -> Result<Option<SourceResponse>> {
		let blob = match pipeline {
			LayerPipeline::LocalOnly(raster) => self.raster_tile(raster, None, address).await?,
			LayerPipeline::Proxy { raster, template } => self.raster_tile(raster, Some(template), address).await?,
			LayerPipeline::ProxyVector(_) => None,
			LayerPipeline::Archive(archive) => return Ok(self.archive_tile(archive, address).await),
		};
		Ok(blob.map(|blob| SourceResponse::new(blob, "image/png")))
	}

	/// Raster layers: the `@2x` tile is native, the standard tile of a retina layer is derived.
	async fn raster_tile(
		&self,
		raster: &RasterLayer,
		template: Option<&str>,
		address: &TileAddress,
	) -> Result<Option<Blob>> {
		if address.extension != "png" {
			return Ok(None);
		}
		match (address.variant, raster.retina) {
			(TileVariant::Retina, false) => Ok(None),
			(TileVariant::Retina, true) | (TileVariant::Standard, false) => {
				self.native_tile(raster, template, address).await
			}
			(TileVariant::Standard, true) => {
				let request = CacheRequest::tile(&raster.name, address);
				cached(&raster.cache, &request, self.context.refresh_hook.as_ref(), move || async move {
					let retina = address.with_variant(TileVariant::Retina);
					match self.native_tile(raster, template, &retina).await? {
						Some(blob) => Ok(Some(derive_standard(blob).await?)),
						None => Ok(None),
					}
				})
				.await
			}
		}
	}

	async fn native_tile(
		&self,
		raster: &RasterLayer,
		template: Option<&str>,
		address: &TileAddress,
	) -> Result<Option<Blob>> {
		let request = CacheRequest::tile(&raster.name, address);
		cached(&raster.cache, &request, self.context.refresh_hook.as_ref(), move || async move {
			match template {
				Some(template) => {
					let url = address.coord.fill_template(template);
					Ok(Some(self.context.upstream.fetch(&url).await?.blob))
				}
				None => Ok(None),
			}
		})
		.await
	}

	async fn vector_tile(&self, source: &VectorSource, address: &TileAddress) -> Result<Option<SourceResponse>> {
		if address.extension != "pbf" || address.variant != TileVariant::Standard {
			return Ok(None);
		}
		let request = CacheRequest::tile(&source.name, address);
		let blob = cached(&source.cache, &request, self.context.refresh_hook.as_ref(), move || async move {
			let url = address.coord.fill_template(&source.template);
			Ok(Some(self.context.upstream.fetch(&url).await?.decompressed()?))
		})
		.await?;
		Ok(blob.map(|blob| SourceResponse::new(blob, "application/x-protobuf")))
	}

	/// Archive layers report every failure as not found.
	async fn archive_tile(&self, archive: &ArchiveLayer, address: &TileAddress) -> Option<SourceResponse> {
		match self.archive_lookup(archive, address).await {
			Ok(response) => response,
			Err(err) => {
				log::warn!("archive layer '{}' failed on {address}, answering 404: {err:#}", archive.name);
				None
			}
		}
	}

	async fn archive_lookup(&self, archive: &ArchiveLayer, address: &TileAddress) -> Result<Option<SourceResponse>> {
		let reader = archive.archive.as_ref();
		let native_extension = reader.is_some_and(|r| r.extension() == address.extension);
		if address.variant != TileVariant::Standard || !(address.extension == "png" || native_extension) {
			return Ok(None);
		}

		let request = CacheRequest::tile(&archive.name, address);
		let blob = cached(&archive.cache, &request, self.context.refresh_hook.as_ref(), move || async move {
			let reader = reader.ok_or_else(|| anyhow!("archive of layer '{}' is not available", archive.name))?;
			reader.get_tile(&address.coord).await
		})
		.await?;

		let mime = match reader {
			Some(reader) => reader.mime().to_owned(),
			None => mime_guess::from_ext(&address.extension).first_or_octet_stream().to_string(),
		};
		Ok(blob.map(|blob| SourceResponse::new(blob, &mime)))
	}
}

fn describe(pipeline: &LayerPipeline) -> String {
	match pipeline {
		LayerPipeline::LocalOnly(raster) => format!("local tiles (retina: {})", raster.retina),
		LayerPipeline::Proxy { raster, template } => format!("proxy of {template} (retina: {})", raster.retina),
		LayerPipeline::ProxyVector(vector) => format!("vector proxy with {} sources", vector.sources.len()),
		LayerPipeline::Archive(archive) => format!("archive (available: {})", archive.archive.is_some()),
	}
}

fn is_safe_segment(segment: &str) -> bool {
	!segment.is_empty() && segment != "." && segment != ".." && !segment.contains(['/', '\\', '\0'])
}

fn is_glyph_range(range: &str) -> bool {
	range
		.split_once('-')
		.is_some_and(|(a, b)| is_number(a) && is_number(b))
}

fn is_number(text: &str) -> bool {
	!text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
