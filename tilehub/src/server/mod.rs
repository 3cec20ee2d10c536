//! HTTP server.
//!
//! - `handlers` holds the response helpers shared by all routes.
//! - `routes` serves the public map endpoints from the current [`PipelineTable`](crate::pipeline::PipelineTable).
//! - `admin` drives the [`LayerService`](crate::layer::LayerService) and requests rebuilds.
//! - `cors` builds the CORS layer from the configured origin patterns.
//! - `tile_server` owns the listener lifecycle and the rebuild supervisor.

mod admin;
mod cors;
mod handlers;
mod routes;
mod tile_server;

pub use tile_server::*;
