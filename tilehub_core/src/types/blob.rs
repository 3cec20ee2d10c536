//! This module provides the [`Blob`] struct, a wrapper around [`Vec<u8>`] used for every
//! payload that moves through the server: tiles, glyph ranges, sprites and style documents.
//!
//! # Examples
//!
//! ```rust
//! use tilehub_core::Blob;
//!
//! let blob = Blob::from("Hello, world!");
//! assert_eq!(blob.len(), 13);
//! assert_eq!(blob.as_str(), "Hello, world!");
//! assert_eq!(blob.into_vec(), b"Hello, world!".to_vec());
//! ```

use std::fmt::Debug;

/// A simple wrapper around [`Vec<u8>`].
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Vec<u8>);

impl Blob {
	/// Creates an empty `Blob`.
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	/// Returns the underlying bytes.
	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		self.0.as_slice()
	}

	/// Consumes the `Blob` and returns the owned bytes.
	#[must_use]
	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	/// Interprets the bytes as UTF-8. Invalid sequences are replaced by an empty string.
	#[must_use]
	pub fn as_str(&self) -> &str {
		std::str::from_utf8(&self.0).unwrap_or_default()
	}

	/// Returns the number of bytes.
	#[must_use]
	pub fn len(&self) -> u64 {
		self.0.len() as u64
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Checks whether the bytes start with the given prefix.
	#[must_use]
	pub fn starts_with(&self, prefix: &[u8]) -> bool {
		self.0.starts_with(prefix)
	}
}

impl From<Vec<u8>> for Blob {
	fn from(item: Vec<u8>) -> Self {
		Blob(item)
	}
}

impl From<&[u8]> for Blob {
	fn from(item: &[u8]) -> Self {
		Blob(item.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(item: &[u8; N]) -> Self {
		Blob(item.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(item: &str) -> Self {
		Blob(item.as_bytes().to_vec())
	}
}

impl From<String> for Blob {
	fn from(item: String) -> Self {
		Blob(item.into_bytes())
	}
}

impl From<&String> for Blob {
	fn from(item: &String) -> Self {
		Blob(item.as_bytes().to_vec())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Blob({}): ", self.0.len())?;
		let preview: String = self.0.iter().take(16).map(|b| format!("{b:02x} ")).collect();
		f.write_str(preview.trim_end())?;
		if self.0.len() > 16 {
			f.write_str(" ...")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn conversions() {
		let blob = Blob::from(vec![1u8, 2, 3]);
		assert_eq!(blob.as_slice(), &[1, 2, 3]);
		assert_eq!(blob.len(), 3);
		assert!(!blob.is_empty());
		assert!(Blob::new_empty().is_empty());
		assert_eq!(Blob::from(&[0x41u8, 0x42]).as_str(), "AB");
		assert_eq!(Blob::from(String::from("tile")).into_vec(), b"tile".to_vec());
	}

	#[test]
	fn invalid_utf8_yields_empty_str() {
		assert_eq!(Blob::from(vec![0xff, 0xfe]).as_str(), "");
	}

	#[test]
	fn debug_preview_is_truncated() {
		let blob = Blob::from(vec![0u8; 20]);
		let debug = format!("{blob:?}");
		assert!(debug.starts_with("Blob(20): 00 00"));
		assert!(debug.ends_with(" ..."));
		assert_eq!(format!("{:?}", Blob::from(&[0xabu8])), "Blob(1): ab");
	}
}
