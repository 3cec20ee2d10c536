//! Which browser origins may read tiles, styles and assets.
//!
//! ```yaml
//! cors:
//!   allowed_origins:
//!     - "https://example.org"
//!     - "*.example.net"
//!   max_age_seconds: 86400
//! ```
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
	/// Origin patterns, `["*"]` unless configured. A pattern is `*`, an exact origin,
	/// `*.example.com` (suffix), `https://maps.*` (prefix) or `/regex/`.
	#[serde(default = "default_allowed_origins")]
	pub allowed_origins: Vec<String>,

	/// Preflight cache lifetime announced to browsers, one day when unset.
	#[serde(default)]
	pub max_age_seconds: Option<u64>,
}

impl Default for CorsConfig {
	fn default() -> Self {
		CorsConfig {
			allowed_origins: default_allowed_origins(),
			max_age_seconds: None,
		}
	}
}

impl CorsConfig {
	pub fn max_age_seconds(&self) -> u64 {
		self.max_age_seconds.unwrap_or(86400)
	}
}

fn default_allowed_origins() -> Vec<String> {
	vec!["*".to_string()]
}
