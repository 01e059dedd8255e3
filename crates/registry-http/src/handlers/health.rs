use std::sync::Arc;

use crate::response::Response;
use crate::state::AppState;

pub async fn health(state: &Arc<AppState>) -> Response {
	if state.health.check().await {
		Response::empty(200)
	} else {
		Response::empty(503)
	}
}
