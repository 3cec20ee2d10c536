//! Producers of tile and asset data: upstream HTTP servers and local MBTiles archives.

mod mbtiles;
mod response;
mod upstream;

pub use mbtiles::MBTilesReader;
pub use response::SourceResponse;
pub use upstream::{Upstream, UpstreamPayload};

#[cfg(test)]
pub(crate) use mbtiles::tests::create_mbtiles;
