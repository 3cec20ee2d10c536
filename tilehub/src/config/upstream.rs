use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
	/// Timeout of a single upstream request.
	pub timeout_seconds: Option<u64>,

	/// `User-Agent` header sent upstream. Defaults to `tilehub/{version}`.
	pub user_agent: Option<String>,
}

impl UpstreamConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
	}

	pub fn user_agent(&self) -> String {
		self
			.user_agent
			.clone()
			.unwrap_or_else(|| format!("tilehub/{}", env!("CARGO_PKG_VERSION")))
	}
}
