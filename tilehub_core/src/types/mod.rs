//! Contains the value types passed between cache, sources and server.

mod blob;
pub use blob::*;

mod tile_address;
pub use tile_address::*;

mod tile_coord;
pub use tile_coord::*;
