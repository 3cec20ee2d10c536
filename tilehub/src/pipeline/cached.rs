use super::RefreshHook;
use anyhow::Result;
use std::future::Future;
use tilehub_core::{
	Blob,
	cache::{CacheRequest, DiskCache},
};

/// Serves `request` from `cache`, or produces, stores and returns it.
///
/// Failing to store a produced blob is logged and does not fail the request.
pub(super) async fn cached<F, Fut>(
	cache: &DiskCache,
	request: &CacheRequest,
	hook: &dyn RefreshHook,
	produce: F,
) -> Result<Option<Blob>>
where
	F: FnOnce() -> Fut,
	Fut: Future<Output = Result<Option<Blob>>>,
{
	if let Some(hit) = cache.get(request).await? {
		log::trace!("cache hit: {request}");
		if hit.should_refresh {
			hook.on_stale(request);
		}
		return Ok(Some(hit.blob));
	}

	log::trace!("cache miss: {request}");
	let Some(blob) = produce().await? else {
		return Ok(None);
	};

	if let Err(err) = cache.set(request, &blob).await {
		log::warn!("could not cache {request}: {err:#}");
	}
	Ok(Some(blob))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pipeline::LogRefreshHook;
	use std::sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	};
	use tempfile::TempDir;
	use tilehub_core::{
		TileAddress,
		cache::{CacheOptions, CachePath},
	};

	#[derive(Debug, Default)]
	struct RecordingHook(Mutex<Vec<String>>);

	impl RefreshHook for RecordingHook {
		fn on_stale(&self, request: &CacheRequest) {
			self.0.lock().unwrap().push(request.to_string());
		}
	}

	fn request() -> CacheRequest {
		CacheRequest::tile("demo", &TileAddress::parse("0", "0", "0.png").unwrap())
	}

	#[tokio::test]
	async fn produces_once_then_hits() -> Result<()> {
		let dir = TempDir::new()?;
		let cache = DiskCache::new(CacheOptions::new(CachePath::directory(dir.path())))?;
		let counter = AtomicUsize::new(0);
		let calls = &counter;
		let produce = move || async move {
			calls.fetch_add(1, Ordering::SeqCst);
			Ok(Some(Blob::from("tile")))
		};

		for _ in 0..3 {
			let blob = cached(&cache, &request(), &LogRefreshHook, produce).await?;
			assert_eq!(blob.unwrap().as_str(), "tile");
		}
		assert_eq!(counter.load(Ordering::SeqCst), 1);
		Ok(())
	}

	#[tokio::test]
	async fn nothing_produced_is_not_cached() -> Result<()> {
		let dir = TempDir::new()?;
		let cache = DiskCache::new(CacheOptions::new(CachePath::directory(dir.path())))?;
		let blob = cached(&cache, &request(), &LogRefreshHook, || async { Ok(None) }).await?;
		assert_eq!(blob, None);
		assert_eq!(cache.get(&request()).await?, None);
		Ok(())
	}

	#[tokio::test]
	async fn write_failure_still_serves() -> Result<()> {
		let dir = TempDir::new()?;
		let root = dir.path().to_path_buf();
		std::fs::write(root.join("file"), "not a directory")?;
		// the lookup finds nothing, the write targets a path below a regular file
		let lookups = Arc::new(AtomicUsize::new(0));
		let path = CachePath::custom(move |_| {
			if lookups.fetch_add(1, Ordering::SeqCst) == 0 {
				root.join("missing.png")
			} else {
				root.join("file/0.png")
			}
		});
		let cache = DiskCache::new(CacheOptions::new(path))?;

		let blob = cached(&cache, &request(), &LogRefreshHook, || async { Ok(Some(Blob::from("fresh"))) }).await?;
		assert_eq!(blob.unwrap().as_str(), "fresh");
		Ok(())
	}

	#[tokio::test]
	async fn stale_hits_reach_the_hook() -> Result<()> {
		let dir = TempDir::new()?;
		let cache = DiskCache::new(
			CacheOptions::new(CachePath::directory(dir.path()))
				.with_maxage(Some(std::time::Duration::from_secs(3600)))
				.with_refreshage(Some(std::time::Duration::from_secs(5))),
		)?;
		cache.set(&request(), &Blob::from("old")).await?;
		let file = dir.path().join("0/0/0.png");
		let past = std::time::SystemTime::now() - std::time::Duration::from_secs(6);
		filetime::set_file_mtime(&file, filetime::FileTime::from_system_time(past))?;

		let hook = Arc::new(RecordingHook::default());
		let blob = cached(&cache, &request(), hook.as_ref(), || async { Ok(Some(Blob::from("new"))) }).await?;
		assert_eq!(blob.unwrap().as_str(), "old");
		assert_eq!(*hook.0.lock().unwrap(), vec!["tile demo/0/0/0.png".to_string()]);
		Ok(())
	}
}
