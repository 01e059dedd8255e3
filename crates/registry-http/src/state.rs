//! Everything a handler needs, assembled once by `registryctl serve` and
//! shared across every connection via `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use registry_core::{BlobStore, RepositoryStore, TagStore};
use registry_migrate::{ImportStateMachine, RenameCoordinator};

/// Abstracts the `/health` dependency checks (DB pool, optional lease
/// backend) so this crate never depends on `sqlx` or `redis` directly.
#[async_trait]
pub trait HealthCheck: Send + Sync {
	async fn check(&self) -> bool;
}

pub struct AppState {
	pub repositories: Arc<dyn RepositoryStore>,
	pub tags: Arc<dyn TagStore>,
	pub blobs: Arc<dyn BlobStore>,
	pub state_machine: Arc<ImportStateMachine>,
	pub rename_coordinator: Arc<RenameCoordinator>,
	pub health: Arc<dyn HealthCheck>,
}
