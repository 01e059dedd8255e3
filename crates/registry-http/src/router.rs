//! A conventional, hand-rolled route table. The control-plane surface is
//! small and fixed (§6), so this is plain path matching rather than a
//! generic routing framework.

use std::sync::Arc;

use http::Method;
use registry_core::{Error, RepositoryPath};

use crate::handlers::{health, import, repositories, repository_paths, tags};
use crate::request::Request;
use crate::response::Response;
use crate::state::AppState;

pub async fn dispatch(state: &Arc<AppState>, req: Request) -> Response {
	let path = req.path().to_string();
	let Some(rest) = path.strip_prefix("/gitlab/v1") else {
		return not_found(&req);
	};

	if rest == "/health" && req.method == Method::GET {
		return health::health(state).await;
	}

	if let Some(suffix) = rest.strip_prefix("/repositories/") {
		if let Some(repo_path) = suffix.strip_suffix("/tags/list") {
			if req.method == Method::GET {
				return match parse_path(repo_path) {
					Ok(path) => tags::list_tags(state, &req, path).await,
					Err(err) => Response::from(err),
				};
			}
		} else if let Some(repo_path) = suffix.strip_suffix("/import") {
			return match (req.method.clone(), parse_path(repo_path)) {
				(Method::PUT, Ok(path)) => import::start_import(state, &req, path).await,
				(Method::GET, Ok(path)) => import::import_status(state, path).await,
				(_, Err(err)) => Response::from(err),
				_ => not_found(&req),
			};
		} else {
			return match (req.method.clone(), parse_path(suffix)) {
				(Method::GET, Ok(path)) => repositories::get_repository(state, &req, path).await,
				(Method::PATCH, Ok(path)) => repositories::rename_repository(state, &req, path).await,
				(_, Err(err)) => Response::from(err),
				_ => not_found(&req),
			};
		}
	}

	if let Some(suffix) = rest.strip_prefix("/repository-paths/") {
		if let Some(repo_path) = suffix.strip_suffix("/repositories/list") {
			if req.method == Method::GET {
				return match parse_path(repo_path) {
					Ok(path) => repository_paths::list_descendants(state, &req, path).await,
					Err(err) => Response::from(err),
				};
			}
		}
	}

	not_found(&req)
}

fn parse_path(raw: &str) -> Result<RepositoryPath, Error> {
	RepositoryPath::parse(raw)
}

fn not_found(req: &Request) -> Response {
	Response::from(&crate::error::HttpError::NotFound {
		method: req.method.to_string(),
		path: req.path().to_string(),
	})
}
