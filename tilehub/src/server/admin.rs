//! Administration endpoints below `/layers`.
//!
//! Every successful change sends a rebuild request to the supervisor in [`TileServer`](super::TileServer).
//! The rebuild restarts the listener, so it can not run inside the request that asked for it.

use super::handlers::{error_400, error_404, error_500, format_error_chain, ok_json};
use crate::layer::{LayerKind, LayerService, LayerSpec};
use axum::{
	Router,
	body::{Body, Bytes},
	extract::{Path, State},
	response::Response,
	routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Clone)]
pub struct AdminState {
	pub service: LayerService,
	pub reload: UnboundedSender<()>,
}

impl AdminState {
	fn request_reload(&self) {
		if self.reload.send(()).is_err() {
			log::warn!("rebuild requested, but the server supervisor is gone");
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArchiveRequest {
	path: PathBuf,
}

fn failed(action: &str, err: &anyhow::Error) -> Response<Body> {
	log::error!("{action} failed:\n{}", format_error_chain(err));
	error_500()
}

fn to_json<T: serde::Serialize>(value: &T) -> Response<Body> {
	match serde_json::to_value(value) {
		Ok(json) => ok_json(&json),
		Err(err) => failed("serializing response", &err.into()),
	}
}

async fn list_layers(State(state): State<AdminState>) -> Response<Body> {
	match state.service.get_layers().await {
		Ok(layers) => to_json(&layers),
		Err(err) => failed("listing layers", &err),
	}
}

async fn add_layer(State(state): State<AdminState>, body: Bytes) -> Response<Body> {
	let spec: LayerSpec = match serde_json::from_slice(&body) {
		Ok(spec) => spec,
		Err(err) => return error_400(&format!("invalid layer: {err}")),
	};
	if let Err(err) = spec.validate() {
		return error_400(&err.to_string());
	}

	let name = spec.name.clone();
	match state.service.add_layer(spec).await {
		Ok(layer) => {
			state.request_reload();
			to_json(&layer)
		}
		Err(err) => failed(&format!("adding layer '{name}'"), &err),
	}
}

async fn delete_layer(Path(name): Path<String>, State(state): State<AdminState>) -> Response<Body> {
	match state.service.delete_layer(&name).await {
		Ok(true) => {
			state.request_reload();
			ok_json(&json!({ "deleted": name }))
		}
		Ok(false) => error_404(),
		Err(err) => failed(&format!("deleting layer '{name}'"), &err),
	}
}

async fn flush_layer(Path(name): Path<String>, State(state): State<AdminState>) -> Response<Body> {
	match state.service.flush_cache(&name).await {
		Ok(true) => ok_json(&json!({ "flushed": name })),
		Ok(false) => error_404(),
		Err(err) => failed(&format!("flushing layer '{name}'"), &err),
	}
}

async fn set_display(state: AdminState, name: String, display: bool) -> Response<Body> {
	match state.service.set_display(&name, display).await {
		Ok(Some(layer)) => {
			state.request_reload();
			to_json(&layer)
		}
		Ok(None) => error_404(),
		Err(err) => failed(&format!("updating layer '{name}'"), &err),
	}
}

async fn show_layer(Path(name): Path<String>, State(state): State<AdminState>) -> Response<Body> {
	set_display(state, name, true).await
}

async fn hide_layer(Path(name): Path<String>, State(state): State<AdminState>) -> Response<Body> {
	set_display(state, name, false).await
}

async fn attach_archive(Path(name): Path<String>, State(state): State<AdminState>, body: Bytes) -> Response<Body> {
	let request: ArchiveRequest = match serde_json::from_slice(&body) {
		Ok(request) => request,
		Err(err) => return error_400(&format!("invalid archive request: {err}")),
	};

	match state.service.store().get_layer(&name).await {
		Ok(Some(layer)) if layer.kind != LayerKind::Mbtiles => {
			return error_400(&format!("layer '{name}' is not an mbtiles layer"));
		}
		Ok(Some(_)) => {}
		Ok(None) => return error_404(),
		Err(err) => return failed(&format!("loading layer '{name}'"), &err),
	}

	match state.service.attach_archive(&name, &request.path).await {
		Ok(Some(layer)) => {
			state.request_reload();
			to_json(&layer)
		}
		Ok(None) => error_404(),
		Err(err) => failed(&format!("attaching archive to layer '{name}'"), &err),
	}
}

pub fn admin_router(state: AdminState) -> Router {
	Router::new()
		.route("/layers", get(list_layers).post(add_layer))
		.route("/layers/{name}", delete(delete_layer))
		.route("/layers/flush/{name}", delete(flush_layer))
		.route("/layers/{name}/show", post(show_layer))
		.route("/layers/{name}/hide", post(hide_layer))
		.route("/layers/{name}/archive", post(attach_archive))
		.with_state(state)
}
