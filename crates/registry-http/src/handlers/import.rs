//! `PUT`/`GET /gitlab/v1/repositories/<path>/import`.

use std::sync::Arc;

use registry_core::{Error, RepositoryPath};
use registry_migrate::{select_route, ImportType};
use serde::Serialize;

use crate::request::Request;
use crate::response::Response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ImportStatusBody {
	name: String,
	path: String,
	status: &'static str,
	detail: Option<String>,
}

pub async fn start_import(state: &Arc<AppState>, req: &Request, path: RepositoryPath) -> Response {
	let import_type = match req.query("import_type") {
		Some(raw) => match raw.parse::<ImportType>() {
			Ok(import_type) => import_type,
			Err(err) => return Response::from(err),
		},
		None => return Response::from(Error::invalid_query_param("import_type", "")),
	};

	match state.state_machine.start(path, import_type).await {
		Ok(outcome) => {
			let route = select_route(Some(outcome.repository.migration_status));
			let status = if outcome.admitted { 202 } else { 200 };
			let body = ImportStatusBody {
				name: outcome.repository.name().to_string(),
				path: outcome.repository.path.as_str().to_string(),
				status: outcome.repository.migration_status.as_str(),
				detail: outcome.repository.migration_error.clone(),
			};
			Response::json(status, &body).with_migration_path(route)
		}
		Err(err) => Response::from(err),
	}
}

pub async fn import_status(state: &Arc<AppState>, path: RepositoryPath) -> Response {
	match state.state_machine.status(&path).await {
		Ok(Some(repository)) => {
			let route = select_route(Some(repository.migration_status));
			let body = ImportStatusBody {
				name: repository.name().to_string(),
				path: repository.path.as_str().to_string(),
				status: repository.migration_status.as_str(),
				detail: repository.migration_error.clone(),
			};
			Response::json(200, &body).with_migration_path(route)
		}
		Ok(None) => Response::from(Error::import_status_unknown(path.as_str())),
		Err(err) => Response::from(err),
	}
}
