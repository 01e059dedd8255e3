//! Errors that originate in the transport layer itself, as opposed to
//! `registry_core::Error`, which originates in a domain operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
	#[error("request body was already consumed")]
	BodyAlreadyConsumed,

	#[error("malformed request body: {0}")]
	MalformedBody(String),

	#[error("request builder is missing its {0}")]
	IncompleteRequest(&'static str),

	#[error("no route matches {method} {path}")]
	NotFound { method: String, path: String },
}

impl HttpError {
	pub fn http_status(&self) -> u16 {
		match self {
			HttpError::BodyAlreadyConsumed | HttpError::MalformedBody(_) => 400,
			HttpError::IncompleteRequest(_) => 500,
			HttpError::NotFound { .. } => 404,
		}
	}
}
