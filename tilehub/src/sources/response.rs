use tilehub_core::Blob;

/// Data ready to be sent to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceResponse {
	pub blob: Blob,
	pub mime: String,
}

impl SourceResponse {
	pub fn new(blob: Blob, mime: &str) -> SourceResponse {
		SourceResponse {
			blob,
			mime: mime.to_owned(),
		}
	}
}
