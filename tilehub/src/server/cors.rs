//! CORS layer built from [`CorsConfig`].
//!
//! Origin patterns:
//! - `*` allows every origin
//! - `*.example.com` matches by suffix
//! - `https://dev-*` matches by prefix
//! - `/^https://(a|b)\.example\.com$/` is a regular expression
//! - anything else has to match exactly

use crate::config::CorsConfig;
use anyhow::{Context, Result};
use axum::http::{HeaderValue, request::Parts};
use regex::Regex;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Debug)]
enum OriginPattern {
	Any,
	Suffix(String),
	Prefix(String),
	Regex(Regex),
	Exact(String),
}

impl OriginPattern {
	fn parse(pattern: &str) -> Result<OriginPattern> {
		if pattern == "*" {
			return Ok(OriginPattern::Any);
		}
		if let Some(expression) = pattern.strip_prefix('/').and_then(|p| p.strip_suffix('/'))
			&& !expression.is_empty()
		{
			let regex = Regex::new(expression).with_context(|| format!("invalid CORS origin pattern '{pattern}'"))?;
			return Ok(OriginPattern::Regex(regex));
		}
		Ok(match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
			(Some(suffix), _) if !suffix.contains('*') => OriginPattern::Suffix(suffix.to_owned()),
			(_, Some(prefix)) if !prefix.contains('*') => OriginPattern::Prefix(prefix.to_owned()),
			_ => OriginPattern::Exact(pattern.to_owned()),
		})
	}

	fn matches(&self, origin: &str) -> bool {
		match self {
			OriginPattern::Any => true,
			OriginPattern::Suffix(suffix) => origin.ends_with(suffix.as_str()),
			OriginPattern::Prefix(prefix) => origin.starts_with(prefix.as_str()),
			OriginPattern::Regex(regex) => regex.is_match(origin),
			OriginPattern::Exact(exact) => origin == exact,
		}
	}
}

pub fn build_cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
	let patterns = config
		.allowed_origins
		.iter()
		.map(|pattern| OriginPattern::parse(pattern))
		.collect::<Result<Vec<_>>>()?;

	Ok(CorsLayer::new()
		.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
			let origin = origin.to_str().unwrap_or("");
			patterns.iter().any(|pattern| pattern.matches(origin))
		}))
		.max_age(Duration::from_secs(config.max_age_seconds())))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		Router,
		body::Body,
		http::{Request, header},
		routing::get,
	};
	use rstest::rstest;
	use tower::ServiceExt;

	fn config(origins: &[&str], max_age_seconds: Option<u64>) -> CorsConfig {
		CorsConfig {
			allowed_origins: origins.iter().map(ToString::to_string).collect(),
			max_age_seconds,
		}
	}

	async fn allowed(origins: &[&str], origin: &str) -> bool {
		let layer = build_cors_layer(&config(origins, None)).unwrap();
		let app = Router::new().route("/", get(|| async { "ok" })).layer(layer);
		let request = Request::builder()
			.uri("/")
			.header(header::ORIGIN, origin)
			.body(Body::empty())
			.unwrap();
		let response = app.oneshot(request).await.unwrap();
		response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
	}

	#[rstest]
	#[case(&["*"], "http://anything.local", true)]
	#[case(&["https://maps.example.org"], "https://maps.example.org", true)]
	#[case(&["https://maps.example.org"], "https://maps.example.com", false)]
	#[case(&["*.example.com"], "https://a.example.com", true)]
	#[case(&["*.example.com"], "https://example.org", false)]
	#[case(&["https://dev-*"], "https://dev-01.example.com", true)]
	#[case(&["https://dev-*"], "https://prod.example.com", false)]
	#[case(&["/^https://(foo|bar)\\.example\\.com$/"], "https://bar.example.com", true)]
	#[case(&["/^https://(foo|bar)\\.example\\.com$/"], "https://baz.example.com", false)]
	#[case(&["https://a.org", "https://b.org"], "https://b.org", true)]
	#[case(&[], "https://b.org", false)]
	#[tokio::test]
	async fn origin_patterns(#[case] origins: &[&str], #[case] origin: &str, #[case] expected: bool) {
		assert_eq!(allowed(origins, origin).await, expected);
	}

	#[test]
	fn broken_regex_is_rejected() {
		assert!(build_cors_layer(&config(&["/(/"], None)).is_err());
	}

	#[tokio::test]
	async fn preflight_max_age() {
		let layer = build_cors_layer(&config(&["*"], Some(7200))).unwrap();
		let app = Router::new().route("/", get(|| async { "ok" })).layer(layer);
		let request = Request::builder()
			.method("OPTIONS")
			.uri("/")
			.header(header::ORIGIN, "https://example.test")
			.header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
			.body(Body::empty())
			.unwrap();
		let response = app.oneshot(request).await.unwrap();
		assert_eq!(response.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "7200");
	}
}
