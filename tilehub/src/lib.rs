//! A caching map tile server.
//!
//! Layers are served from a local cache directory, proxied from an upstream tile server or style,
//! or read from a local MBTiles archive. Every generated tile, glyph range and sprite is stored
//! in a filesystem cache with configurable freshness windows.

pub mod config;
pub mod layer;
pub mod pipeline;
pub mod server;
pub mod sources;
pub mod style;

pub use config::Config;
pub use server::TileServer;
