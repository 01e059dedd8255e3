//! `GET`/`PATCH /gitlab/v1/repositories/<path>`.

use std::sync::Arc;
use std::time::Duration;

use registry_core::{Error, RepositoryPath};
use registry_migrate::{parse_dry_run, select_route, RenameOutcome};
use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::response::Response;
use crate::state::AppState;

/// Bound on how long a size aggregation may run before `size_precision`
/// falls back to an estimate, standing in for the "24h internal timeout
/// budget" a production deployment would configure (see DESIGN.md).
const SIZE_QUERY_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Serialize)]
struct RepositoryDetail {
	name: String,
	path: String,
	status: Option<&'static str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	size_bytes: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	size_precision: Option<&'static str>,
}

pub async fn get_repository(state: &Arc<AppState>, req: &Request, path: RepositoryPath) -> Response {
	let repository = match state.repositories.find_by_path(&path).await {
		Ok(Some(repository)) => repository,
		Ok(None) => return Response::from(Error::name_unknown(path.as_str())),
		Err(err) => return Response::from(err),
	};

	let route = select_route(Some(repository.migration_status));
	let size_mode = req.query("size");
	let precision = req.query("size_precision").unwrap_or("default");

	let (size_bytes, size_precision) = match size_mode {
		None => (None, None),
		Some(mode) => match compute_size(state, &repository, mode, precision).await {
			Ok(result) => result,
			Err(err) => return Response::from(err).with_migration_path(route),
		},
	};

	let body = RepositoryDetail {
		name: repository.name().to_string(),
		path: repository.path.into_string(),
		status: Some(repository.migration_status.as_str()),
		size_bytes,
		size_precision,
	};
	Response::json(200, &body).with_migration_path(route)
}

async fn compute_size(
	state: &Arc<AppState>,
	repository: &registry_core::Repository,
	mode: &str,
	precision: &str,
) -> Result<(Option<u64>, Option<&'static str>), Error> {
	if precision != "default" && precision != "untagged" {
		return Err(Error::invalid_query_param("size_precision", precision));
	}

	let aggregate = async {
		let mut total = state.blobs.total_size(repository.id).await?;
		if mode == "self_with_descendants" {
			let descendants = state.repositories.find_descendants(&repository.path).await?;
			for descendant in descendants {
				total += state.blobs.total_size(descendant.id).await?;
			}
		} else if mode != "self" {
			return Err(Error::invalid_query_param("size", mode));
		}
		Ok(total)
	};

	if precision == "default" {
		return aggregate.await.map(|total| (Some(total), Some("default")));
	}

	match tokio::time::timeout(SIZE_QUERY_TIMEOUT, aggregate).await {
		Ok(result) => result.map(|total| (Some(total), Some("default"))),
		Err(_) => {
			// Fall back to the repository's own blob total, skipping descendants,
			// as a cheaper (and intentionally coarser) estimate.
			let total = state.blobs.total_size(repository.id).await?;
			Ok((Some(total), Some("estimated")))
		}
	}
}

#[derive(Debug, Deserialize)]
struct RenameBody {
	name: String,
}

#[derive(Debug, Serialize)]
struct RenamePreview {
	ttl_seconds: u64,
}

pub async fn rename_repository(state: &Arc<AppState>, req: &Request, path: RepositoryPath) -> Response {
	let dry_run = match parse_dry_run(req.query("dry_run")) {
		Ok(dry_run) => dry_run,
		Err(err) => return Response::from(err),
	};
	let body: RenameBody = match req.json() {
		Ok(body) => body,
		Err(err) => return Response::from(err),
	};

	match state.rename_coordinator.rename(&path, &body.name, dry_run).await {
		Ok(RenameOutcome::DryRun { ttl }) => Response::json(200, &RenamePreview { ttl_seconds: ttl.as_secs() }),
		Ok(RenameOutcome::Committed) => Response::empty(204),
		Err(err) => Response::from(err),
	}
}
