//! The inbound request shape handlers are written against. Transport-agnostic:
//! `registry-server` builds one of these from a `hyper::Request` and never
//! hands handlers the raw hyper type.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::error::HttpError;

/// A single, already-buffered request. The body can only be read once —
/// mirroring a streaming body that's been drained into memory — so a second
/// `read_body` call is a programming error, not a retry opportunity.
pub struct Request {
	pub method: Method,
	pub path: String,
	pub query_params: HashMap<String, String>,
	pub path_params: HashMap<String, String>,
	pub headers: HeaderMap,
	body: Mutex<Option<Bytes>>,
}

impl Request {
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn query(&self, name: &str) -> Option<&str> {
		self.query_params.get(name).map(String::as_str)
	}

	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(String::as_str)
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Consumes the buffered body. Returns an error if called more than once.
	pub fn read_body(&self) -> Result<Bytes, HttpError> {
		self.body
			.lock()
			.unwrap()
			.take()
			.ok_or(HttpError::BodyAlreadyConsumed)
	}

	/// Convenience over [`Request::read_body`] for JSON bodies; an empty body
	/// is treated as `{}` so callers with all-optional fields aren't forced
	/// to special-case a missing body.
	pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, HttpError> {
		let bytes = self.read_body()?;
		let bytes = if bytes.is_empty() { Bytes::from_static(b"{}") } else { bytes };
		serde_json::from_slice(&bytes).map_err(|e| HttpError::MalformedBody(e.to_string()))
	}
}

#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	path: Option<String>,
	query_params: HashMap<String, String>,
	path_params: HashMap<String, String>,
	headers: HeaderMap,
	body: Bytes,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	/// Sets the path and parses its query string, if any.
	pub fn uri(mut self, uri: &str) -> Self {
		match uri.split_once('?') {
			Some((path, query)) => {
				self.path = Some(path.to_string());
				if let Ok(parsed) = serde_urlencoded::from_str::<HashMap<String, String>>(query) {
					self.query_params = parsed;
				}
			}
			None => self.path = Some(uri.to_string()),
		}
		self
	}

	pub fn path_params(mut self, params: HashMap<String, String>) -> Self {
		self.path_params = params;
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	pub fn body(mut self, body: Bytes) -> Self {
		self.body = body;
		self
	}

	pub fn build(self) -> Result<Request, HttpError> {
		Ok(Request {
			method: self.method.ok_or(HttpError::IncompleteRequest("method"))?,
			path: self.path.ok_or(HttpError::IncompleteRequest("uri"))?,
			query_params: self.query_params,
			path_params: self.path_params,
			headers: self.headers,
			body: Mutex::new(Some(self.body)),
		})
	}
}
