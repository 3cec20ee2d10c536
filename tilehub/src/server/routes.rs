//! Public map routes. Every request is answered by the [`PipelineTable`] that is current when it
//! arrives.

use super::handlers::{error_404, respond};
use crate::pipeline::{MapRequest, PipelineTable};
use arc_swap::ArcSwap;
use axum::{
	Router,
	body::Body,
	extract::{Path, State},
	response::Response,
	routing::get,
};
use std::sync::Arc;
use tilehub_core::TileAddress;

#[derive(Clone)]
pub struct MapState {
	pub table: Arc<ArcSwap<PipelineTable>>,
}

async fn serve(state: &MapState, request: MapRequest) -> Response<Body> {
	log::debug!("handle {request}");
	let table = state.table.load_full();
	let result = table.serve(&request).await;
	respond(request, result)
}

async fn serve_tile(
	Path((name, z, x, file)): Path<(String, String, String, String)>,
	State(state): State<MapState>,
) -> Response<Body> {
	match TileAddress::parse(&z, &x, &file) {
		Some(address) => serve(&state, MapRequest::Tile { name, address }).await,
		None => {
			log::debug!("malformed tile path {name}/{z}/{x}/{file}");
			error_404()
		}
	}
}

async fn serve_style(Path(layer): Path<String>, State(state): State<MapState>) -> Response<Body> {
	serve(&state, MapRequest::Style { layer }).await
}

async fn serve_glyphs(
	Path((layer, fontstack, file)): Path<(String, String, String)>,
	State(state): State<MapState>,
) -> Response<Body> {
	match file.strip_suffix(".pbf") {
		Some(range) => {
			let range = range.to_owned();
			serve(&state, MapRequest::Glyphs { layer, fontstack, range }).await
		}
		None => error_404(),
	}
}

async fn serve_sprite(Path(path): Path<String>, State(state): State<MapState>) -> Response<Body> {
	let resolved = state.table.load().resolve_sprite(&path);
	match resolved {
		Some((layer, filename)) => serve(&state, MapRequest::Sprite { layer, filename }).await,
		None => {
			log::debug!("no layer for sprite '{path}'");
			error_404()
		}
	}
}

/// Routes of the public endpoints, relative to the configured prefix.
pub fn map_router(table: Arc<ArcSwap<PipelineTable>>) -> Router {
	Router::new()
		.route("/maps/{name}/style.json", get(serve_style))
		.route("/maps/{name}/{z}/{x}/{file}", get(serve_tile))
		.route("/glyphs/{layer}/{fontstack}/{file}", get(serve_glyphs))
		.route("/sprites/{path}", get(serve_sprite))
		.with_state(MapState { table })
}
