//! Server lifecycle.
//!
//! [`TileServer`] composes the router, binds the listener and runs the rebuild supervisor:
//! whenever the layer set changes, the listener is shut down gracefully, the server waits
//! `reload_grace`, rebuilds the [`PipelineTable`] from the store, swaps it in and binds again.

use super::{
	admin::{AdminState, admin_router},
	cors::build_cors_layer,
	routes::map_router,
};
use crate::{
	config::{Config, CorsConfig, ServerConfig},
	layer::{FileLayerStore, LayerService, LayerStore, MemoryLayerStore},
	pipeline::{PipelineContext, PipelineTable},
	sources::Upstream,
};
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use axum::{Router, routing::get};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
	net::TcpListener,
	sync::{
		mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
		oneshot,
	},
	task::JoinHandle,
};

pub struct TileServer {
	config: ServerConfig,
	cors: CorsConfig,
	service: LayerService,
	context: PipelineContext,
	table: Arc<ArcSwap<PipelineTable>>,
	reload_sender: UnboundedSender<()>,
	reload_receiver: Option<UnboundedReceiver<()>>,
	/// Signals graceful shutdown to the serving task.
	exit_signal: Option<oneshot::Sender<()>>,
	join: Option<JoinHandle<()>>,
	/// Address of the last successful bind. Rebinding reuses its port, so `port: 0` stays stable.
	local_addr: Option<SocketAddr>,
}

impl TileServer {
	/// Opens the layer store, seeds the default layers and builds the first pipeline table.
	pub async fn from_config(config: Config) -> Result<TileServer> {
		let store: Arc<dyn LayerStore> = match &config.store.path {
			Some(path) => Arc::new(FileLayerStore::open(path).await?),
			None => {
				log::warn!("no store path configured, layers are kept in memory only");
				Arc::new(MemoryLayerStore::new())
			}
		};
		let upstream = Upstream::new(&config.upstream)?;
		let service = LayerService::new(store, upstream.clone(), config.cache.clone(), &config.server.base_url());
		let context = PipelineContext::new(upstream, config.cache.clone());
		context.validate()?;

		let seeded = service.seed_defaults(&config.layers).await?;
		if seeded > 0 {
			log::info!("added {seeded} default layers");
		}

		TileServer::new(config.server, config.cors, service, context).await
	}

	pub async fn new(
		config: ServerConfig,
		cors: CorsConfig,
		service: LayerService,
		context: PipelineContext,
	) -> Result<TileServer> {
		context.validate()?;
		let table = PipelineTable::build(service.store().as_ref(), context.clone()).await?;
		let (reload_sender, reload_receiver) = unbounded_channel();

		Ok(TileServer {
			config,
			cors,
			service,
			context,
			table: Arc::new(ArcSwap::from_pointee(table)),
			reload_sender,
			reload_receiver: Some(reload_receiver),
			exit_signal: None,
			join: None,
			local_addr: None,
		})
	}

	pub fn service(&self) -> &LayerService {
		&self.service
	}

	/// The pipeline table currently answering requests.
	pub fn table(&self) -> Arc<PipelineTable> {
		self.table.load_full()
	}

	pub fn local_addr(&self) -> Option<SocketAddr> {
		self.local_addr
	}

	fn build_router(&self) -> Result<Router> {
		let prefix = self.config.prefix();
		let public = map_router(Arc::clone(&self.table));

		let mut router = Router::new().route("/status", get(|| async { "ready!" }));
		router = if prefix.is_empty() {
			router.merge(public)
		} else {
			router.nest(&prefix, public)
		};

		if self.config.admin_enabled() {
			router = router.merge(admin_router(AdminState {
				service: self.service.clone(),
				reload: self.reload_sender.clone(),
			}));
		}

		Ok(router.layer(build_cors_layer(&self.cors)?))
	}

	/// Binds the listener and starts serving. A running instance is stopped first.
	pub async fn start(&mut self) -> Result<()> {
		if self.exit_signal.is_some() || self.join.is_some() {
			self.stop().await;
		}

		let router = self.build_router()?;

		let port = self.local_addr.map_or(self.config.port(), |addr| addr.port());
		let addr = format!("{}:{port}", self.config.ip());
		let listener = TcpListener::bind(&addr)
			.await
			.with_context(|| format!("binding to {addr}"))?;
		let local_addr = listener.local_addr()?;
		log::info!("server listening on {local_addr}");

		let (tx, rx) = oneshot::channel::<()>();
		let handle = tokio::spawn(async move {
			if let Err(err) = axum::serve(listener, router.into_make_service())
				.with_graceful_shutdown(async {
					rx.await.ok();
				})
				.await
			{
				log::error!("server task exited with error: {err}");
			}
		});

		self.exit_signal = Some(tx);
		self.join = Some(handle);
		self.local_addr = Some(local_addr);
		Ok(())
	}

	/// Shuts the listener down gracefully and waits for the serving task. Does nothing if stopped.
	pub async fn stop(&mut self) {
		if self.exit_signal.is_none() && self.join.is_none() {
			return;
		}
		log::info!("stopping server");

		if let Some(tx) = self.exit_signal.take() {
			let _ = tx.send(());
		}
		if let Some(handle) = self.join.take() {
			match tokio::time::timeout(Duration::from_secs(10), handle).await {
				Ok(Err(err)) => log::warn!("server task join error: {err}"),
				Ok(Ok(())) => {}
				Err(_) => log::warn!("server task did not shut down within 10s"),
			}
		}
	}

	/// Rebuilds the pipeline table from the store and swaps it in. On failure the current
	/// table stays active.
	pub async fn rebuild(&self) -> Result<()> {
		let table = PipelineTable::build(self.service.store().as_ref(), self.context.clone()).await?;
		log::info!("rebuilt pipelines of {} layers", table.layer_names().len());
		self.table.store(Arc::new(table));
		Ok(())
	}

	/// Stop, wait the grace delay, rebuild, bind again.
	pub async fn reload(&mut self) -> Result<()> {
		self.stop().await;
		tokio::time::sleep(self.config.reload_grace()).await;
		if let Err(err) = self.rebuild().await {
			log::error!("rebuild failed, keeping the previous layers: {err:#}");
		}
		self.start().await
	}

	/// Serves until `shutdown` resolves, reloading whenever a rebuild is requested.
	pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
		let mut reloads = self
			.reload_receiver
			.take()
			.context("the server supervisor is already running")?;
		self.start().await?;

		tokio::pin!(shutdown);
		loop {
			tokio::select! {
				() = &mut shutdown => break,
				Some(()) = reloads.recv() => {
					// several changes in a row need a single rebuild
					while reloads.try_recv().is_ok() {}
					log::info!("layers changed, reloading");
					self.reload().await?;
				}
			}
		}

		self.stop().await;
		Ok(())
	}
}
