//! Response helpers shared by the public and the admin routes.
//!
//! CORS headers are added by the `CorsLayer` only, never here.

use crate::sources::SourceResponse;
use axum::{
	body::Body,
	http::{StatusCode, header},
	response::Response,
};
use std::fmt::Display;

/// Turns the outcome of a source lookup into a response: `Ok(None)` is a 404, `Err` a 500.
pub fn respond(request: impl Display, result: anyhow::Result<Option<SourceResponse>>) -> Response<Body> {
	match result {
		Ok(Some(response)) => {
			log::debug!("send response for {request}");
			ok_data(response)
		}
		Ok(None) => {
			log::debug!("send 404 for {request}");
			error_404()
		}
		Err(err) => {
			log::warn!("send 500 for {request}. Error:\n{}", format_error_chain(&err));
			error_500()
		}
	}
}

pub fn format_error_chain(err: &anyhow::Error) -> String {
	let mut result = err.to_string();
	for (i, cause) in err.chain().skip(1).enumerate() {
		if i == 0 {
			result.push_str("\n  Caused by:");
		}
		result.push_str(&format!("\n    {cause}"));
	}
	result
}

fn build(status: StatusCode, content_type: &str, body: Vec<u8>) -> Response<Body> {
	let mut response = Response::new(Body::from(body));
	*response.status_mut() = status;
	if let Ok(value) = content_type.parse() {
		response.headers_mut().insert(header::CONTENT_TYPE, value);
	}
	response
}

pub fn error_with(status: StatusCode, message: &str) -> Response<Body> {
	build(status, "text/plain; charset=utf-8", message.as_bytes().to_vec())
}

pub fn error_400(message: &str) -> Response<Body> {
	error_with(StatusCode::BAD_REQUEST, message)
}

pub fn error_404() -> Response<Body> {
	error_with(StatusCode::NOT_FOUND, "Not Found")
}

pub fn error_500() -> Response<Body> {
	error_with(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

pub fn ok_data(result: SourceResponse) -> Response<Body> {
	build(StatusCode::OK, &result.mime, result.blob.into_vec())
}

pub fn ok_json(json: &serde_json::Value) -> Response<Body> {
	build(StatusCode::OK, "application/json", json.to_string().into_bytes())
}
