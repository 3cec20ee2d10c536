use anyhow::Result;
use std::path::PathBuf;
use tilehub::{Config, TileServer};
use tokio::time::{Duration, sleep};

#[derive(clap::Args, Debug)]
#[command(disable_version_flag = true, verbatim_doc_comment)]
pub struct Subcommand {
	/// Path to a configuration file (YAML) with server, cache, store and default layer settings.
	/// Command line arguments override the `server` section.
	#[arg(short = 'c', long, value_name = "FILE", display_order = 0)]
	pub config: Option<PathBuf>,

	/// Serve via socket ip. Default: 0.0.0.0
	#[arg(short = 'i', long, display_order = 0)]
	pub ip: Option<String>,

	/// Serve via port. Default: 3000
	#[arg(short, long, display_order = 0)]
	pub port: Option<u16>,

	/// Path prefix of the public map routes, e.g. "/tiles"
	#[arg(long, display_order = 1)]
	pub prefix: Option<String>,

	/// Externally visible URL used in published layer and style URLs.
	/// Default: http://localhost:{port}
	#[arg(long, display_order = 1, verbatim_doc_comment)]
	pub public_url: Option<String>,

	/// Disable the /layers administration endpoints
	#[arg(long, display_order = 2)]
	pub disable_admin: Option<bool>,

	/// Shutdown server automatically after x milliseconds.
	#[arg(long, display_order = 4)]
	pub auto_shutdown: Option<u64>,
}

pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
	match path {
		Some(path) => Config::from_path(path),
		None => Ok(Config::default()),
	}
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let mut config = load_config(arguments.config.as_ref())?;
	config.server.override_optional_ip(&arguments.ip);
	config.server.override_optional_port(&arguments.port);
	config.server.override_optional_prefix(&arguments.prefix);
	config.server.override_optional_public_url(&arguments.public_url);
	config.server.override_optional_disable_admin(&arguments.disable_admin);

	let server = TileServer::from_config(config).await?;
	for name in server.table().layer_names() {
		eprintln!("   {name}");
	}

	let auto_shutdown = arguments.auto_shutdown;
	server
		.run(async move {
			match auto_shutdown {
				Some(milliseconds) => sleep(Duration::from_millis(milliseconds)).await,
				None => {
					if let Err(err) = tokio::signal::ctrl_c().await {
						log::error!("waiting for ctrl-c failed: {err}");
						std::future::pending::<()>().await;
					}
				}
			}
		})
		.await
}

#[cfg(test)]
mod tests {
	use crate::tests::run_command;
	use anyhow::Result;
	use std::fs;
	use tempfile::TempDir;

	#[test]
	fn serve_with_config_and_defaults() -> Result<()> {
		let dir = TempDir::new()?;
		let config = dir.path().join("tilehub.yaml");
		fs::write(
			&config,
			"store:\n  path: layers.json\nlayers:\n  - name: local\n    type: tiles\n",
		)?;

		run_command(vec![
			"tilehub",
			"serve",
			"-c",
			config.to_str().unwrap(),
			"-i",
			"127.0.0.1",
			"-p",
			"0",
			"--auto-shutdown",
			"300",
		])?;

		let store = fs::read_to_string(dir.path().join("layers.json"))?;
		assert!(store.contains("\"local\""));
		Ok(())
	}

	#[test]
	fn missing_config_file_fails() {
		assert!(run_command(vec!["tilehub", "serve", "-c", "/does/not/exist.yaml"]).is_err());
	}
}
