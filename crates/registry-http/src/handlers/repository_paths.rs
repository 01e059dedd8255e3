//! `GET /gitlab/v1/repository-paths/<path>/repositories/list`.
//!
//! `RepositoryStore::find_descendants` has no native pagination, so this
//! materializes the (lease-limited, ≤1000-row) subtree and paginates it
//! in-process the same way the tag listing paginates at the query layer.

use std::sync::Arc;

use registry_core::{PageRequest, RepositoryPath};
use serde::Serialize;

use crate::pagination::paginate_in_memory;
use crate::request::Request;
use crate::response::Response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct RepositoryEntry {
	name: String,
	path: String,
}

pub async fn list_descendants(state: &Arc<AppState>, req: &Request, path: RepositoryPath) -> Response {
	let page = match PageRequest::parse(req.query("n"), req.query("last"), req.query("name")) {
		Ok(page) => page,
		Err(err) => return Response::from(err),
	};

	let descendants = match state.repositories.find_descendants(&path).await {
		Ok(descendants) => descendants,
		Err(err) => return Response::from(err),
	};

	let (page_items, has_more) = paginate_in_memory(descendants, &page, |r| r.path.as_str());
	let entries: Vec<RepositoryEntry> = page_items
		.into_iter()
		.map(|r| RepositoryEntry {
			name: r.name().to_string(),
			path: r.path.into_string(),
		})
		.collect();

	let mut response = Response::json(200, &entries);
	if has_more {
		if let Some(last) = entries.last() {
			let base_url = format!("/gitlab/v1/repository-paths/{path}/repositories/list");
			let link = crate::pagination::next_link(&base_url, &last.path, page.n, page.name.as_deref());
			response = response.with_header("link", link);
		}
	}
	response
}
