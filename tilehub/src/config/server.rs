use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_IP: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RELOAD_GRACE_MS: u64 = 500;

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
	/// IP to bind to.
	pub ip: Option<String>,

	/// TCP port to bind to.
	pub port: Option<u16>,

	/// URL path prefix of every public route, e.g. `/tiles`.
	pub prefix: Option<String>,

	/// Externally visible origin used in published tile and style URLs, e.g. `https://maps.example.org`.
	/// Defaults to `http://localhost:{port}`.
	pub public_url: Option<String>,

	/// Delay between stopping the listener and rebuilding after a layer change.
	pub reload_grace_ms: Option<u64>,

	/// Disable the `/layers` administration endpoints.
	pub disable_admin: Option<bool>,
}

impl ServerConfig {
	pub fn override_optional_ip(&mut self, ip: &Option<String>) {
		if ip.is_some() {
			self.ip = ip.clone();
		}
	}
	pub fn override_optional_port(&mut self, port: &Option<u16>) {
		if port.is_some() {
			self.port = *port;
		}
	}
	pub fn override_optional_prefix(&mut self, prefix: &Option<String>) {
		if prefix.is_some() {
			self.prefix = prefix.clone();
		}
	}
	pub fn override_optional_public_url(&mut self, public_url: &Option<String>) {
		if public_url.is_some() {
			self.public_url = public_url.clone();
		}
	}
	pub fn override_optional_disable_admin(&mut self, disable_admin: &Option<bool>) {
		if disable_admin.is_some() {
			self.disable_admin = *disable_admin;
		}
	}

	pub fn ip(&self) -> &str {
		self.ip.as_deref().unwrap_or(DEFAULT_IP)
	}

	pub fn port(&self) -> u16 {
		self.port.unwrap_or(DEFAULT_PORT)
	}

	/// The route prefix normalised to either `""` or `/segment[/segment...]` without trailing slash.
	pub fn prefix(&self) -> String {
		normalize_prefix(self.prefix.as_deref().unwrap_or(""))
	}

	/// `public_url + prefix`, the base of every URL this server publishes.
	pub fn base_url(&self) -> String {
		let public_url = match &self.public_url {
			Some(url) => url.trim_end_matches('/').to_owned(),
			None => format!("http://localhost:{}", self.port()),
		};
		format!("{public_url}{}", self.prefix())
	}

	pub fn reload_grace(&self) -> Duration {
		Duration::from_millis(self.reload_grace_ms.unwrap_or(DEFAULT_RELOAD_GRACE_MS))
	}

	pub fn admin_enabled(&self) -> bool {
		!self.disable_admin.unwrap_or(false)
	}
}

fn normalize_prefix(prefix: &str) -> String {
	let trimmed = prefix.trim().trim_matches('/');
	if trimmed.is_empty() {
		String::new()
	} else {
		format!("/{trimmed}")
	}
}
