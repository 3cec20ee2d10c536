//! Transport compression of upstream payloads.
//!
//! Vector tile servers commonly answer with gzip-compressed protobuf, sometimes announced by a
//! `Content-Encoding` header and sometimes not. Cached vector tiles are always stored
//! uncompressed, so [`decompress_payload`] normalises whatever arrives.

use crate::Blob;
use anyhow::{Context, Result, bail};
use brotli::BrotliDecompress;
use flate2::bufread::GzDecoder;
use std::io::{Cursor, Read};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompresses data that was compressed using Gzip.
pub fn decompress_gzip(blob: &Blob) -> Result<Blob> {
	let mut decoder = GzDecoder::new(blob.as_slice());
	let mut decompressed_data = Vec::new();
	decoder
		.read_to_end(&mut decompressed_data)
		.context("Failed to decompress data using Gzip")?;
	Ok(Blob::from(decompressed_data))
}

/// Decompresses data that was compressed using Brotli.
pub fn decompress_brotli(blob: &Blob) -> Result<Blob> {
	let mut cursor = Cursor::new(blob.as_slice());
	let mut decompressed_data = Vec::new();
	BrotliDecompress(&mut cursor, &mut decompressed_data).context("Failed to decompress data using Brotli")?;
	Ok(Blob::from(decompressed_data))
}

/// Returns the uncompressed payload.
///
/// `content_encoding` is the upstream `Content-Encoding` header, if any. Gzip is also detected
/// by its magic bytes, because many tile servers omit the header.
pub fn decompress_payload(blob: Blob, content_encoding: Option<&str>) -> Result<Blob> {
	let encoding = content_encoding.map(|e| e.trim().to_ascii_lowercase());
	match encoding.as_deref() {
		Some("br") => decompress_brotli(&blob),
		Some("gzip" | "x-gzip") => decompress_gzip(&blob),
		None | Some("" | "identity") => {
			if blob.starts_with(&GZIP_MAGIC) {
				decompress_gzip(&blob)
			} else {
				Ok(blob)
			}
		}
		Some(other) => bail!("unsupported content encoding '{other}'"),
	}
}
