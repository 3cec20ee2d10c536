use super::{CachePath, CacheRequest};
use crate::Blob;
use anyhow::{Context, Result, ensure};
use std::{
	io::ErrorKind,
	path::Path,
	time::{Duration, SystemTime},
};

/// Settings of a [`DiskCache`].
#[derive(Clone, Debug)]
pub struct CacheOptions {
	pub path: CachePath,
	/// Entries older than this are treated as absent. `None` keeps entries forever,
	/// zero disables the cache entirely.
	pub maxage: Option<Duration>,
	/// Entries older than this are still served but flagged for refresh.
	pub refreshage: Option<Duration>,
}

impl CacheOptions {
	pub fn new(path: CachePath) -> CacheOptions {
		CacheOptions {
			path,
			maxage: None,
			refreshage: None,
		}
	}

	#[must_use]
	pub fn with_maxage(mut self, maxage: Option<Duration>) -> CacheOptions {
		self.maxage = maxage;
		self
	}

	#[must_use]
	pub fn with_refreshage(mut self, refreshage: Option<Duration>) -> CacheOptions {
		self.refreshage = refreshage;
		self
	}
}

/// A servable cache entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheHit {
	pub blob: Blob,
	/// The entry is older than the refresh window.
	pub should_refresh: bool,
}

/// A filesystem cache. Entries are plain files, their age is the file's modification time.
#[derive(Clone, Debug)]
pub struct DiskCache {
	options: CacheOptions,
}

impl DiskCache {
	/// # Errors
	/// Fails if `refreshage` is set without `maxage`.
	pub fn new(options: CacheOptions) -> Result<DiskCache> {
		ensure!(
			options.refreshage.is_none() || options.maxage.is_some(),
			"cache option 'refreshage' requires 'maxage' to be set"
		);
		Ok(DiskCache { options })
	}

	pub fn options(&self) -> &CacheOptions {
		&self.options
	}

	fn is_disabled(&self) -> bool {
		self.options.maxage == Some(Duration::ZERO)
	}

	/// Looks up an entry. Missing and expired entries are both reported as `None`;
	/// expired files are left on disk.
	pub async fn get(&self, request: &CacheRequest) -> Result<Option<CacheHit>> {
		if self.is_disabled() {
			return Ok(None);
		}

		let path = self.options.path.resolve(request);
		let metadata = match tokio::fs::metadata(&path).await {
			Ok(metadata) => metadata,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e).with_context(|| format!("reading metadata of {path:?}")),
		};

		let modified = metadata
			.modified()
			.with_context(|| format!("reading modification time of {path:?}"))?;
		let age = SystemTime::now().duration_since(modified).unwrap_or_default();

		if self.options.maxage.is_some_and(|maxage| age >= maxage) {
			log::trace!("cache entry {path:?} expired ({}s old)", age.as_secs());
			return Ok(None);
		}
		let should_refresh = self.options.refreshage.is_some_and(|refreshage| age > refreshage);

		let data = match tokio::fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e).with_context(|| format!("reading cache file {path:?}")),
		};

		Ok(Some(CacheHit {
			blob: Blob::from(data),
			should_refresh,
		}))
	}

	/// Stores an entry, creating parent directories and replacing any existing file.
	pub async fn set(&self, request: &CacheRequest, blob: &Blob) -> Result<()> {
		if self.is_disabled() {
			return Ok(());
		}

		let path = self.options.path.resolve(request);
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.with_context(|| format!("creating cache directory {parent:?}"))?;
		}
		tokio::fs::write(&path, blob.as_slice())
			.await
			.with_context(|| format!("writing cache file {path:?}"))?;
		log::trace!("cached {request} at {path:?}");
		Ok(())
	}

	/// Deletes every entry. Only directory caches have a single tree to remove;
	/// for the other path kinds this is a no-op returning `false`.
	pub async fn remove_all(&self) -> Result<bool> {
		match self.options.path.root() {
			Some(root) => remove_dir(root).await,
			None => Ok(false),
		}
	}
}

/// Removes a directory tree; a missing directory is not an error.
pub async fn remove_dir(path: &Path) -> Result<bool> {
	match tokio::fs::remove_dir_all(path).await {
		Ok(()) => {
			log::debug!("removed {path:?}");
			Ok(true)
		}
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
		Err(e) => Err(e).with_context(|| format!("removing {path:?}")),
	}
}
