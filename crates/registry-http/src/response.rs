//! The outbound response shape, and the `IntoResponse`-equivalent that maps
//! domain and transport errors onto it.

use bytes::Bytes;
use http::HeaderMap;
use registry_migrate::Route;
use serde::Serialize;

use crate::error::HttpError;

#[derive(Debug, Clone)]
pub struct Response {
	pub status: u16,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	pub fn empty(status: u16) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn json(status: u16, body: &impl Serialize) -> Self {
		match serde_json::to_vec(body) {
			Ok(bytes) => {
				let mut headers = HeaderMap::new();
				headers.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
				Self {
					status,
					headers,
					body: Bytes::from(bytes),
				}
			}
			Err(err) => Response::from(&registry_core::Error::Internal(err.to_string())),
		}
	}

	pub fn with_header(mut self, name: &'static str, value: String) -> Self {
		if let Ok(value) = http::HeaderValue::from_str(&value) {
			self.headers.insert(http::HeaderName::from_static(name), value);
		}
		self
	}

	/// Stamps the `Gitlab-Migration-Path` header every repository-touching
	/// response carries (§4.5 / §8 property 6).
	pub fn with_migration_path(self, route: Route) -> Self {
		self.with_header("gitlab-migration-path", route.header_value().to_string())
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	code: &'static str,
	message: String,
}

impl From<&registry_core::Error> for Response {
	fn from(err: &registry_core::Error) -> Self {
		let body = ErrorBody {
			code: err.code().as_str(),
			message: err.detail(),
		};
		Response::json(err.http_status(), &body)
	}
}

impl From<registry_core::Error> for Response {
	fn from(err: registry_core::Error) -> Self {
		Response::from(&err)
	}
}

impl From<&HttpError> for Response {
	fn from(err: &HttpError) -> Self {
		let body = ErrorBody {
			code: "BAD_REQUEST",
			message: err.to_string(),
		};
		Response::json(err.http_status(), &body)
	}
}

impl From<HttpError> for Response {
	fn from(err: HttpError) -> Self {
		Response::from(&err)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use registry_core::Error;

	#[test]
	fn domain_errors_carry_their_table_status_and_code() {
		let response: Response = Error::pre_import_in_progress().into();
		assert_eq!(response.status, 425);
		assert!(String::from_utf8_lossy(&response.body).contains("PRE_IMPORT_IN_PROGRESS"));
	}

	#[test]
	fn migration_path_header_is_stamped() {
		let response = Response::empty(200).with_migration_path(Route::New);
		assert_eq!(response.headers.get("gitlab-migration-path").unwrap(), "new");
	}
}
