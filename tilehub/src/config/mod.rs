//! Server configuration.
//!
//! The configuration is read from a YAML file (see [`Config::from_path`]). Every section is
//! optional, command line arguments override individual fields of the `server` section.
//!
//! ```yaml
//! server:
//!   ip: 0.0.0.0
//!   port: 3000
//!   public_url: https://tiles.example.org
//! cache:
//!   tiles_path: tiles
//!   assets_path: assets
//!   maxage_seconds: 2592000
//! store:
//!   path: layers.json
//! layers:
//!   - name: osm
//!     label: OpenStreetMap
//!     type: proxy
//!     source: https://tile.openstreetmap.org/{z}/{x}/{y}.png
//! ```

mod cache;
mod cors;
mod main;
mod server;
mod store;
mod upstream;

pub use cache::CacheConfig;
pub use cors::CorsConfig;
pub use main::Config;
pub use server::ServerConfig;
pub use store::StoreConfig;
pub use upstream::UpstreamConfig;
