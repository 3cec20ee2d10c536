//! Administrative operations on layers.

use super::{Layer, LayerKind, LayerSpec, LayerStatus, LayerStore, StyleRecord, is_valid_source_id};
use crate::{
	config::CacheConfig,
	sources::Upstream,
	style::{first_tile_url, public_source, rewrite_style},
};
use anyhow::{Context, Result, bail, ensure};
use serde_json::Value;
use std::{
	collections::BTreeMap,
	io::ErrorKind,
	path::{Component, Path},
	sync::Arc,
};
use tilehub_core::cache::remove_dir;

#[derive(Clone, Debug)]
pub struct LayerService {
	store: Arc<dyn LayerStore>,
	upstream: Upstream,
	cache: CacheConfig,
	base_url: String,
}

impl LayerService {
	/// `base_url` is `public_url + prefix`, the base of the URLs published for each layer.
	pub fn new(store: Arc<dyn LayerStore>, upstream: Upstream, cache: CacheConfig, base_url: &str) -> LayerService {
		LayerService {
			store,
			upstream,
			cache,
			base_url: base_url.trim_end_matches('/').to_owned(),
		}
	}

	pub fn store(&self) -> &Arc<dyn LayerStore> {
		&self.store
	}

	pub async fn get_layers(&self) -> Result<Vec<Layer>> {
		self.store.get_layers().await
	}

	/// Validates, completes and stores a layer. An existing layer with the same name is replaced.
	///
	/// Vector layers fetch their upstream style, which is rewritten and stored next to the layer.
	/// A layer must not answer a route that another layer already answers.
	pub async fn add_layer(&self, spec: LayerSpec) -> Result<Layer> {
		spec.validate()?;
		log::info!("add {:?} layer '{}'", spec.kind, spec.name);

		let public_source = public_source(&spec, &self.base_url);
		let status = match spec.kind {
			LayerKind::Mbtiles if !self.cache.archive_path(&spec.name).is_file() => LayerStatus::Created,
			_ => LayerStatus::Ready,
		};
		let mut layer = Layer::from_spec(&spec, public_source, status);

		if spec.vector {
			let style = self.prepare_vector_layer(&mut layer).await?;
			self.ensure_routes_free(&layer).await?;
			self.store.put_layer(layer.clone()).await?;
			self
				.store
				.put_style(StyleRecord {
					layer: layer.name.clone(),
					style,
				})
				.await?;
		} else {
			self.ensure_routes_free(&layer).await?;
			self.store.put_layer(layer.clone()).await?;
			self.store.delete_style(&layer.name).await?;
		}
		Ok(layer)
	}

	async fn ensure_routes_free(&self, layer: &Layer) -> Result<()> {
		let claimed = layer.route_names();
		for other in self.store.get_layers().await? {
			if other.name == layer.name {
				continue;
			}
			if let Some(route) = other.route_names().into_iter().find(|route| claimed.contains(route)) {
				bail!(
					"layer '{}' conflicts with layer '{}', both would answer '/maps/{route}'",
					layer.name,
					other.name
				);
			}
		}
		Ok(())
	}

	async fn prepare_vector_layer(&self, layer: &mut Layer) -> Result<Value> {
		let url = layer
			.source
			.as_deref()
			.with_context(|| format!("vector layer '{}' needs a style URL", layer.name))?;
		let mut upstream_style = self
			.upstream
			.fetch_json(url)
			.await
			.with_context(|| format!("fetching style of layer '{}'", layer.name))?;

		if let Some(original) = upstream_style.get_mut("sources").and_then(Value::as_object_mut) {
			original.retain(|id, _| {
				let valid = is_valid_source_id(id);
				if !valid {
					log::warn!("dropping source '{id}' of layer '{}', it is not a valid source id", layer.name);
				}
				valid
			});
		}

		let mut sources = BTreeMap::new();
		if let Some(original) = upstream_style.get("sources").and_then(Value::as_object) {
			for (id, source) in original {
				sources.insert(id.clone(), self.resolve_tilejson(source).await);
			}
		}

		let style = rewrite_style(&layer.name, &self.base_url, &upstream_style)?;
		layer.glyphs_source = upstream_style.get("glyphs").and_then(Value::as_str).map(str::to_owned);
		layer.sprite_source = upstream_style.get("sprite").and_then(Value::as_str).map(str::to_owned);
		layer.sources = Some(sources);
		layer.style = Some(style.clone());
		Ok(style)
	}

	/// Sources that reference a TileJSON instead of listing `tiles` get the TileJSON's tile URLs.
	async fn resolve_tilejson(&self, source: &Value) -> Value {
		if first_tile_url(source).is_some() {
			return source.clone();
		}
		let Some(url) = source.get("url").and_then(Value::as_str) else {
			return source.clone();
		};
		let mut resolved = source.clone();
		match self.upstream.fetch_json(url).await {
			Ok(tilejson) => match (tilejson.get("tiles"), resolved.as_object_mut()) {
				(Some(tiles), Some(object)) => {
					object.insert("tiles".into(), tiles.clone());
				}
				_ => log::warn!("TileJSON '{url}' lists no tiles"),
			},
			Err(err) => log::warn!("could not resolve TileJSON '{url}': {err:#}"),
		}
		resolved
	}

	/// Removes the layer and its style. Cached files stay on disk.
	pub async fn delete_layer(&self, name: &str) -> Result<bool> {
		let deleted = self.store.delete_layer(name).await?;
		if deleted {
			log::info!("deleted layer '{name}'");
		}
		Ok(deleted)
	}

	/// Removes every cache directory of a layer. Records are not touched.
	///
	/// Returns `false` for unknown layers.
	pub async fn flush_cache(&self, name: &str) -> Result<bool> {
		let Some(layer) = self.store.get_layer(name).await? else {
			return Ok(false);
		};

		let tiles = self.cache.tiles_path.as_path();
		let assets = self.cache.assets_path.as_path();
		let mut directories = vec![(tiles, self.cache.layer_dir(name)), (assets, self.cache.assets_dir(name))];
		directories.extend(layer.vector_source_names().iter().map(|n| (tiles, self.cache.layer_dir(n))));
		for (root, directory) in &directories {
			ensure!(
				is_direct_child(root, directory),
				"refusing to flush {directory:?}, it is not a directory directly below {root:?}"
			);
		}
		for (_, directory) in directories {
			remove_dir(&directory).await?;
		}
		log::info!("flushed cache of layer '{name}'");
		Ok(true)
	}

	/// Sets the `display` flag. Returns `None` for unknown layers.
	pub async fn set_display(&self, name: &str, display: bool) -> Result<Option<Layer>> {
		let Some(mut layer) = self.store.get_layer(name).await? else {
			return Ok(None);
		};
		layer.display = display;
		self.store.put_layer(layer.clone()).await?;
		Ok(Some(layer))
	}

	/// Moves a local file to `{tiles_path}/{name}.mbtiles` and marks the layer ready.
	/// Returns `None` for unknown layers.
	pub async fn attach_archive(&self, name: &str, file: &Path) -> Result<Option<Layer>> {
		let Some(mut layer) = self.store.get_layer(name).await? else {
			return Ok(None);
		};
		if layer.kind != LayerKind::Mbtiles {
			bail!("layer '{name}' is not an mbtiles layer");
		}

		let target = self.cache.archive_path(name);
		if let Some(parent) = target.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		move_file(file, &target).await?;
		log::info!("attached archive {file:?} to layer '{name}'");

		layer.status = LayerStatus::Ready;
		self.store.put_layer(layer.clone()).await?;
		Ok(Some(layer))
	}

	/// Adds the configured default layers if the store is empty.
	///
	/// A default that cannot be added is logged and skipped. Returns the number of added layers.
	pub async fn seed_defaults(&self, specs: &[LayerSpec]) -> Result<usize> {
		if !self.store.get_layers().await?.is_empty() {
			return Ok(0);
		}
		let mut added = 0;
		for spec in specs {
			match self.add_layer(spec.clone()).await {
				Ok(_) => added += 1,
				Err(err) => log::error!("could not add default layer '{}': {err:#}", spec.name),
			}
		}
		Ok(added)
	}
}

fn is_direct_child(root: &Path, directory: &Path) -> bool {
	directory.strip_prefix(root).is_ok_and(|rest| {
		let mut components = rest.components();
		matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
	})
}

async fn move_file(source: &Path, target: &Path) -> Result<()> {
	match tokio::fs::rename(source, target).await {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == ErrorKind::NotFound => Err(e).with_context(|| format!("archive {source:?} not found")),
		Err(_) => {
			// e.g. source and target on different filesystems
			tokio::fs::copy(source, target)
				.await
				.with_context(|| format!("copying {source:?} to {target:?}"))?;
			tokio::fs::remove_file(source)
				.await
				.with_context(|| format!("removing {source:?}"))?;
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{config::UpstreamConfig, layer::MemoryLayerStore};
	use pretty_assertions::assert_eq;
	use serde_json::json;
	use tempfile::TempDir;

	fn service(dir: &Path) -> LayerService {
		let cache = CacheConfig {
			tiles_path: dir.join("tiles"),
			assets_path: dir.join("assets"),
			..CacheConfig::default()
		};
		LayerService::new(
			Arc::new(MemoryLayerStore::new()),
			Upstream::new(&UpstreamConfig::default()).unwrap(),
			cache,
			"http://local/",
		)
	}

	fn write(path: &Path) {
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		std::fs::write(path, "x").unwrap();
	}

	#[tokio::test]
	async fn add_computes_public_source_and_status() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());

		let mut spec = LayerSpec::new("osm", LayerKind::Proxy, Some("http://t/{z}/{x}/{y}@2x.png"));
		spec.retina = true;
		let layer = service.add_layer(spec).await?;
		assert_eq!(layer.public_source, "http://local/maps/osm/{z}/{x}/{y}@2x.png");
		assert_eq!(layer.status, LayerStatus::Ready);

		let archive = service.add_layer(LayerSpec::new("berlin", LayerKind::Mbtiles, None)).await?;
		assert_eq!(archive.status, LayerStatus::Created);

		write(&dir.path().join("tiles/ready.mbtiles"));
		let archive = service.add_layer(LayerSpec::new("ready", LayerKind::Mbtiles, None)).await?;
		assert_eq!(archive.status, LayerStatus::Ready);

		assert_eq!(service.get_layers().await?.len(), 3);
		Ok(())
	}

	#[tokio::test]
	async fn add_rejects_invalid_specs() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		assert!(service.add_layer(LayerSpec::new("osm", LayerKind::Proxy, None)).await.is_err());
		assert!(service.add_layer(LayerSpec::new("../x", LayerKind::Tiles, None)).await.is_err());
		assert!(service.get_layers().await?.is_empty());
		Ok(())
	}

	#[tokio::test]
	async fn adding_an_existing_name_replaces_it() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		service.add_layer(LayerSpec::new("a", LayerKind::Tiles, None)).await?;
		let mut spec = LayerSpec::new("a", LayerKind::Tiles, None);
		spec.label = Some("A".into());
		service.add_layer(spec).await?;

		let layers = service.get_layers().await?;
		assert_eq!(layers.len(), 1);
		assert_eq!(layers[0].label.as_deref(), Some("A"));
		Ok(())
	}

	#[tokio::test]
	async fn delete_keeps_cached_files() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		service.add_layer(LayerSpec::new("local", LayerKind::Tiles, None)).await?;
		let tile = dir.path().join("tiles/local/0/0/0.png");
		write(&tile);

		assert!(service.delete_layer("local").await?);
		assert!(!service.delete_layer("local").await?);
		assert!(service.store().get_layer("local").await?.is_none());
		assert!(tile.exists());
		Ok(())
	}

	#[tokio::test]
	async fn flush_removes_every_cache_directory_but_keeps_records() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());

		let mut layer = Layer::from_spec(
			&LayerSpec::new("demo", LayerKind::Proxy, Some("http://x/style.json")),
			String::new(),
			LayerStatus::Ready,
		);
		layer.vector = true;
		layer.sources = Some(BTreeMap::from([("a".to_string(), json!({}))]));
		service.store().put_layer(layer).await?;
		service
			.store()
			.put_style(StyleRecord {
				layer: "demo".into(),
				style: json!({}),
			})
			.await?;

		let files = [
			dir.path().join("tiles/demo/0/0/0.png"),
			dir.path().join("tiles/demo-a/0/0/0.pbf"),
			dir.path().join("assets/demo/sprites/sprite.json"),
		];
		let other = dir.path().join("tiles/other/0/0/0.png");
		for file in files.iter().chain([&other]) {
			write(file);
		}

		assert!(service.flush_cache("demo").await?);
		for file in &files {
			assert!(!file.exists(), "{file:?} should be gone");
		}
		assert!(other.exists());
		assert!(service.store().get_layer("demo").await?.is_some());
		assert!(service.store().get_style("demo").await?.is_some());

		assert!(!service.flush_cache("unknown").await?);
		Ok(())
	}

	fn vector_layer(name: &str, ids: &[&str]) -> Layer {
		let mut layer = Layer::from_spec(
			&LayerSpec::new(name, LayerKind::Proxy, Some("http://x/style.json")),
			String::new(),
			LayerStatus::Ready,
		);
		layer.vector = true;
		layer.sources = Some(ids.iter().map(|id| ((*id).to_string(), json!({}))).collect());
		layer
	}

	#[tokio::test]
	async fn flush_stays_inside_the_cache_directories() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		service.store().put_layer(vector_layer("demo", &["a", "x/../.."])).await?;

		let own = dir.path().join("tiles/demo-a/0/0/0.pbf");
		let store_file = dir.path().join("layers.json");
		let neighbour = dir.path().join("tiles/demo-x/0/0/0.pbf");
		let other = dir.path().join("tiles/other/0/0/0.png");
		for file in [&own, &store_file, &neighbour, &other] {
			write(file);
		}

		assert!(service.flush_cache("demo").await?);
		assert!(!own.exists());
		assert!(store_file.exists());
		assert!(neighbour.exists());
		assert!(other.exists());
		Ok(())
	}

	#[tokio::test]
	async fn flush_refuses_names_leaving_the_cache() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		let broken = Layer::from_spec(&LayerSpec::new("..", LayerKind::Tiles, None), String::new(), LayerStatus::Ready);
		service.store().put_layer(broken).await?;
		let store_file = dir.path().join("layers.json");
		write(&store_file);

		assert!(service.flush_cache("..").await.is_err());
		assert!(store_file.exists());
		assert!(is_direct_child(Path::new("/c/tiles"), Path::new("/c/tiles/demo-a")));
		assert!(!is_direct_child(Path::new("/c/tiles"), Path::new("/c/tiles/x/../..")));
		assert!(!is_direct_child(Path::new("/c/tiles"), Path::new("/etc")));
		assert!(!is_direct_child(Path::new("/c/tiles"), Path::new("/c/tiles")));
		Ok(())
	}

	#[tokio::test]
	async fn routes_of_different_layers_must_not_collide() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		service.store().put_layer(vector_layer("demo", &["a"])).await?;

		let error = service.add_layer(LayerSpec::new("demo-a", LayerKind::Tiles, None)).await.unwrap_err();
		assert!(error.to_string().contains("conflicts with layer 'demo'"));
		assert!(service.store().get_layer("demo-a").await?.is_none());

		service.add_layer(LayerSpec::new("base-b", LayerKind::Tiles, None)).await?;
		assert!(service.ensure_routes_free(&vector_layer("base", &["b"])).await.is_err());
		assert!(service.ensure_routes_free(&vector_layer("base", &["c"])).await.is_ok());
		assert!(service.ensure_routes_free(&vector_layer("demo", &["a", "b"])).await.is_ok());
		assert!(service.ensure_routes_free(&vector_layer("demo-a", &["x"])).await.is_err());
		Ok(())
	}

	#[tokio::test]
	async fn replacing_a_vector_layer_drops_its_style() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		service.store().put_layer(vector_layer("demo", &["a"])).await?;
		service
			.store()
			.put_style(StyleRecord {
				layer: "demo".into(),
				style: json!({"version": 8}),
			})
			.await?;

		let layer = service.add_layer(LayerSpec::new("demo", LayerKind::Tiles, None)).await?;
		assert!(!layer.vector);
		assert_eq!(service.store().get_style("demo").await?, None);
		assert!(service.store().get_layer("demo").await?.unwrap().sources.is_none());
		Ok(())
	}

	#[tokio::test]
	async fn show_and_hide() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		service.add_layer(LayerSpec::new("a", LayerKind::Tiles, None)).await?;

		assert!(!service.set_display("a", false).await?.unwrap().display);
		assert!(!service.store().get_layer("a").await?.unwrap().display);
		assert!(service.set_display("a", true).await?.unwrap().display);
		assert!(service.set_display("b", true).await?.is_none());
		Ok(())
	}

	#[tokio::test]
	async fn attach_archive_moves_the_file() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		service.add_layer(LayerSpec::new("berlin", LayerKind::Mbtiles, None)).await?;
		service.add_layer(LayerSpec::new("local", LayerKind::Tiles, None)).await?;
		let upload = dir.path().join("upload.tmp");
		write(&upload);

		let layer = service.attach_archive("berlin", &upload).await?.unwrap();
		assert_eq!(layer.status, LayerStatus::Ready);
		assert!(!upload.exists());
		assert!(dir.path().join("tiles/berlin.mbtiles").exists());

		assert!(service.attach_archive("missing", &upload).await?.is_none());
		write(&upload);
		assert!(service.attach_archive("local", &upload).await.is_err());
		assert!(service.attach_archive("berlin", &dir.path().join("nope")).await.is_err());
		Ok(())
	}

	#[tokio::test]
	async fn defaults_are_seeded_into_an_empty_store_only() -> Result<()> {
		let dir = TempDir::new()?;
		let service = service(dir.path());
		let defaults = vec![
			LayerSpec::new("osm", LayerKind::Proxy, Some("http://t/{z}/{x}/{y}.png")),
			LayerSpec::new("broken", LayerKind::Proxy, None),
			LayerSpec::new("local", LayerKind::Tiles, None),
		];

		assert_eq!(service.seed_defaults(&defaults).await?, 2);
		assert_eq!(service.seed_defaults(&defaults).await?, 0);
		assert_eq!(service.get_layers().await?.len(), 2);
		Ok(())
	}
}
