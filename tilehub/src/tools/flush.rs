use super::serve::load_config;
use anyhow::{Result, bail};
use std::{path::PathBuf, sync::Arc};
use tilehub::{
	layer::{FileLayerStore, LayerService},
	sources::Upstream,
};

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// Name of the layer
	#[arg(required = true)]
	pub layer: String,

	/// Path to the configuration file (YAML) naming the store and the cache directories.
	#[arg(short = 'c', long, value_name = "FILE")]
	pub config: Option<PathBuf>,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let config = load_config(arguments.config.as_ref())?;
	let Some(store_path) = &config.store.path else {
		bail!("flushing needs a layer store, set 'store.path' in the configuration");
	};

	let store = FileLayerStore::open(store_path).await?;
	let service = LayerService::new(
		Arc::new(store),
		Upstream::new(&config.upstream)?,
		config.cache.clone(),
		&config.server.base_url(),
	);

	if service.flush_cache(&arguments.layer).await? {
		eprintln!("flushed cache of layer '{}'", arguments.layer);
		Ok(())
	} else {
		bail!("unknown layer '{}'", arguments.layer)
	}
}
