//! Filesystem cache for tiles, glyphs and sprites.
//!
//! Every artifact is described by a [`CacheRequest`], mapped to a file by a [`CachePath`]
//! and stored by a [`DiskCache`], which decides freshness from the file's modification time.

mod disk_cache;
pub use disk_cache::*;

mod path;
pub use path::*;

mod request;
pub use request::*;
