
use serde_json::{Value, json};
use tempfile::TempDir;
use test_utilities::*;
use tilehub::TileServer;
use tokio::sync::oneshot;

struct Running {
	dir: TempDir,
	url: String,
	client: reqwest::Client,
	shutdown: oneshot::Sender<()>,
	task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Running {
	async fn start() -> Running {
		let dir = TempDir::new().unwrap();
		let port = free_port();
		let server = TileServer::from_config(config(dir.path(), port)).await.unwrap();
		let (shutdown, signal) = oneshot::channel::<()>();
		let task = tokio::spawn(server.run(async move {
			signal.await.ok();
		}));
		let url = format!("http://127.0.0.1:{port}");
		wait_for_status(&format!("{url}/status"), 200).await;
		Running {
			dir,
			url,
			client: reqwest::Client::builder().pool_max_idle_per_host(0).build().unwrap(),
			shutdown,
			task,
		}
	}

	/// Sends a request, retrying while the listener is down for a rebuild.
	async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (u16, Value) {
		for _ in 0..100 {
			let mut request = self.client.request(method.clone(), format!("{}{path}", self.url));
			if let Some(body) = &body {
				request = request.body(body.to_string());
			}
			match request.send().await {
				Ok(response) => {
					let status = response.status().as_u16();
					let text = response.text().await.unwrap();
					return (status, serde_json::from_str(&text).unwrap_or(Value::String(text)));
				}
				Err(err) if err.is_connect() => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
				Err(err) => panic!("{path}: {err}"),
			}
		}
		panic!("{path}: server never came back");
	}

	fn write(&self, path: &str) -> std::path::PathBuf {
		let file = self.dir.path().join(path);
		std::fs::create_dir_all(file.parent().unwrap()).unwrap();
		std::fs::write(&file, "data").unwrap();
		file
	}

	async fn stop(self) {
		self.shutdown.send(()).unwrap();
		self.task.await.unwrap().unwrap();
	}
}

#[tokio::test]
async fn rebuild_picks_up_added_and_deleted_layers() {
	let hub = Running::start().await;
	let tile_url = format!("{}/maps/late/0/0/0.png", hub.url);
	let tile = hub.write("tiles/late/0/0/0.png");
	assert_eq!(get(&tile_url).await.0, 404);

	let (status, layer) = hub
		.send(
			reqwest::Method::POST,
			"/layers",
			Some(json!({ "name": "late", "type": "tiles", "label": "Late" })),
		)
		.await;
	assert_eq!(status, 200);
	assert_eq!(layer["label"], "Late");
	wait_for_status(&tile_url, 200).await;

	let (status, layers) = hub.send(reqwest::Method::GET, "/layers", None).await;
	assert_eq!(status, 200);
	assert_eq!(layers.as_array().unwrap().len(), 1);

	// deleting keeps the cached files
	let (status, _) = hub.send(reqwest::Method::DELETE, "/layers/late", None).await;
	assert_eq!(status, 200);
	wait_for_status(&tile_url, 404).await;
	assert!(tile.exists());

	hub.stop().await;
}

#[tokio::test]
async fn flush_removes_cache_directories_only() {
	let upstream = MockUpstream::start().await;
	let hub = Running::start().await;

	let (status, _) = hub
		.send(
			reqwest::Method::POST,
			"/layers",
			Some(json!({ "name": "demo", "type": "proxy", "vector": true, "source": format!("{}/style.json", upstream.url) })),
		)
		.await;
	assert_eq!(status, 200);
	let style_url = format!("{}/maps/demo/style.json", hub.url);
	wait_for_status(&style_url, 200).await;
	let tile_url = format!("{}/maps/demo-base/1/1/1.pbf", hub.url);
	assert_eq!(get(&tile_url).await.0, 200);
	assert_eq!(get(&format!("{}/sprites/demo.json", hub.url)).await.0, 200);

	let files = [
		hub.dir.path().join("tiles/demo-base/1/1/1.pbf"),
		hub.dir.path().join("assets/demo/sprites/sprite.json"),
	];
	assert!(files.iter().all(|f| f.exists()));

	let (status, _) = hub.send(reqwest::Method::DELETE, "/layers/flush/demo", None).await;
	assert_eq!(status, 200);
	assert!(files.iter().all(|f| !f.exists()));
	assert_eq!(get(&style_url).await.0, 200);

	// the next request fetches again
	assert_eq!(get(&tile_url).await.0, 200);
	assert_eq!(upstream.hits("/vt/1/1/1.pbf"), 2);

	let (status, _) = hub.send(reqwest::Method::DELETE, "/layers/flush/nope", None).await;
	assert_eq!(status, 404);

	hub.stop().await;
}

#[tokio::test]
async fn changes_are_persisted() {
	let hub = Running::start().await;
	let (status, _) = hub
		.send(
			reqwest::Method::POST,
			"/layers",
			Some(json!({ "name": "kept", "type": "tiles" })),
		)
		.await;
	assert_eq!(status, 200);
	let (status, _) = hub.send(reqwest::Method::POST, "/layers/kept/hide", None).await;
	assert_eq!(status, 200);
	let dir = hub.dir.path().to_path_buf();
	let store = std::fs::read_to_string(dir.join("layers.json")).unwrap();
	hub.stop().await;

	let stored: Value = serde_json::from_str(&store).unwrap();
	assert_eq!(stored["layers"]["kept"]["display"], false);
	assert_eq!(stored["layers"]["kept"]["status"], "ready");
}
