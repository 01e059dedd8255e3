//! `GET /gitlab/v1/repositories/<path>/tags/list`.

use std::sync::Arc;

use registry_core::{Error, PageRequest, RepositoryPath};
use registry_migrate::select_route;
use serde::Serialize;

use crate::request::Request;
use crate::response::Response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct TagEntry {
	name: String,
	digest: String,
}

pub async fn list_tags(state: &Arc<AppState>, req: &Request, path: RepositoryPath) -> Response {
	let page = match PageRequest::parse(req.query("n"), req.query("last"), req.query("name")) {
		Ok(page) => page,
		Err(err) => return Response::from(err),
	};

	let repository = match state.repositories.find_by_path(&path).await {
		Ok(Some(repository)) => repository,
		Ok(None) => return Response::from(Error::name_unknown(path.as_str())),
		Err(err) => return Response::from(err),
	};
	let route = select_route(Some(repository.migration_status));

	let result = match state.tags.list(repository.id, &page).await {
		Ok(result) => result,
		Err(err) => return Response::from(err).with_migration_path(route),
	};

	let entries: Vec<TagEntry> = result
		.items
		.iter()
		.map(|tag| TagEntry {
			name: tag.name.clone(),
			digest: tag.manifest_digest.clone().into(),
		})
		.collect();

	let mut response = Response::json(200, &entries).with_migration_path(route);
	if result.has_more {
		if let Some(last) = entries.last() {
			let base_url = format!("/gitlab/v1/repositories/{path}/tags/list");
			let link = crate::pagination::next_link(&base_url, &last.name, page.n, page.name.as_deref());
			response = response.with_header("link", link);
		}
	}
	response
}
