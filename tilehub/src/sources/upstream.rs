//! HTTP client for upstream tile servers, styles, glyphs and sprites.

use crate::config::UpstreamConfig;
use anyhow::{Context, Result, bail};
use reqwest::{
	Client,
	header::{CONTENT_ENCODING, CONTENT_TYPE},
};
use serde_json::Value;
use tilehub_core::{Blob, compression::decompress_payload};

/// A fetched upstream body, exactly as transferred.
#[derive(Clone, Debug)]
pub struct UpstreamPayload {
	pub blob: Blob,
	pub content_encoding: Option<String>,
	pub content_type: Option<String>,
}

impl UpstreamPayload {
	/// The body with any transport compression removed.
	pub fn decompressed(self) -> Result<Blob> {
		decompress_payload(self.blob, self.content_encoding.as_deref())
	}
}

/// Shared HTTP client. Requests are never retried.
#[derive(Clone, Debug)]
pub struct Upstream {
	client: Client,
}

impl Upstream {
	pub fn new(config: &UpstreamConfig) -> Result<Upstream> {
		let client = Client::builder()
			.timeout(config.timeout())
			.user_agent(config.user_agent())
			.build()
			.context("building upstream HTTP client")?;
		Ok(Upstream { client })
	}

	/// GETs `url`. Network failures and non-2xx answers are errors.
	pub async fn fetch(&self, url: &str) -> Result<UpstreamPayload> {
		log::debug!("fetch upstream {url}");

		let response = self
			.client
			.get(url)
			.send()
			.await
			.with_context(|| format!("requesting '{url}'"))?;

		let status = response.status();
		if !status.is_success() {
			bail!("upstream '{url}' answered with status {status}");
		}

		let header = |name| {
			response
				.headers()
				.get(name)
				.and_then(|v| v.to_str().ok())
				.map(str::to_owned)
		};
		let content_encoding = header(CONTENT_ENCODING);
		let content_type = header(CONTENT_TYPE);

		let bytes = response
			.bytes()
			.await
			.with_context(|| format!("reading body of '{url}'"))?;

		Ok(UpstreamPayload {
			blob: Blob::from(bytes.to_vec()),
			content_encoding,
			content_type,
		})
	}

	/// GETs and parses a JSON document, e.g. a style or a TileJSON.
	pub async fn fetch_json(&self, url: &str) -> Result<Value> {
		let blob = self.fetch(url).await?.decompressed()?;
		serde_json::from_slice(blob.as_slice()).with_context(|| format!("parsing JSON from '{url}'"))
	}
}
