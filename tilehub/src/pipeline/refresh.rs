use std::fmt::Debug;
use tilehub_core::cache::CacheRequest;

/// Receives cache hits that are older than the refresh window.
///
/// The stale entry is served either way. Implementations may schedule a regeneration.
pub trait RefreshHook: Send + Sync + Debug {
	fn on_stale(&self, request: &CacheRequest);
}

/// Only logs stale hits.
#[derive(Debug, Default)]
pub struct LogRefreshHook;

impl RefreshHook for LogRefreshHook {
	fn on_stale(&self, request: &CacheRequest) {
		log::debug!("{request} is due for refresh, serving cached copy");
	}
}
