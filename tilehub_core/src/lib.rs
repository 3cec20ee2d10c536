//! Building blocks shared by the tilehub server: byte blobs, tile coordinates, payload
//! decompression and the filesystem cache with its freshness policy.

pub mod cache;

pub mod compression;

pub mod types;
pub use types::*;
