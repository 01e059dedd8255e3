//! Assembles the process-wide [`registry_http::AppState`] from a resolved
//! [`registry_conf::Config`]: one Postgres pool, the old/new-side storage
//! drivers, an optional Redis-backed lease store, and the migration engine
//! built on top of them.

use std::sync::Arc;

use anyhow::{Context, Result};
use registry_conf::Config;
use registry_core::{MetricsSink, NoopMetricsSink};
use registry_db::postgres::{
	run_migrations, PostgresBlobStore, PostgresManifestStore, PostgresNamespaceStore, PostgresRepositoryStore,
	PostgresTagStore,
};
use registry_db::RedisLeaseStore;
use registry_http::AppState;
use registry_migrate::{ConcurrencyGate, ImportNotifier, ImportStateMachine, Importer, RenameCoordinator};
use registry_storage::FilesystemStorageDriver;
use sqlx::postgres::PgPoolOptions;

use crate::health::DatabaseHealth;

/// `SPEC_FULL.md` §4.8 lists no dedicated rename-lease timeout config key;
/// renames share the pre-import timeout's order of magnitude instead of
/// inventing an unconfigurable new setting (see DESIGN.md).
const DEFAULT_RENAME_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

pub async fn build_app_state(config: &Config) -> Result<Arc<AppState>> {
	let pool = PgPoolOptions::new()
		.connect(&config.database.url)
		.await
		.context("connecting to the database")?;
	run_migrations(&pool).await.context("applying database migrations")?;

	let old_side = Arc::new(FilesystemStorageDriver::new(config.migration.old_root_directory.clone()));
	let new_side = Arc::new(FilesystemStorageDriver::new(config.migration.root_directory.clone()));

	let namespaces = Arc::new(PostgresNamespaceStore::new(pool.clone()));
	let repositories = Arc::new(PostgresRepositoryStore::new(pool.clone()));
	let blobs = Arc::new(PostgresBlobStore::new(pool.clone()));
	let manifests = Arc::new(PostgresManifestStore::new(pool.clone()));
	let tags = Arc::new(PostgresTagStore::new(pool.clone()));

	let redis_pool = match &config.redis.url {
		Some(url) => {
			let cfg = deadpool_redis::Config::from_url(url);
			Some(cfg.create_pool(Some(deadpool_redis::Runtime::Tokio1)).context("building the redis pool")?)
		}
		None => None,
	};
	let leases: Option<Arc<dyn registry_core::LeaseStore>> =
		redis_pool.clone().map(|pool| Arc::new(RedisLeaseStore::new(pool)) as Arc<dyn registry_core::LeaseStore>);

	let metrics: Arc<dyn MetricsSink> = Arc::new(NoopMetricsSink);
	let gate = Arc::new(ConcurrencyGate::new(config.migration.max_concurrent_imports, Arc::clone(&metrics)));

	let importer = Arc::new(Importer::new(
		Arc::clone(&old_side) as Arc<dyn registry_core::StorageDriver>,
		Arc::clone(&new_side) as Arc<dyn registry_core::StorageDriver>,
		Arc::clone(&blobs) as Arc<dyn registry_core::BlobStore>,
		Arc::clone(&manifests) as Arc<dyn registry_core::ManifestStore>,
		Arc::clone(&tags) as Arc<dyn registry_core::TagStore>,
		config.migration.tag_concurrency,
		config.migration.test_slow_import,
	));
	let notifier = Arc::new(ImportNotifier::new(
		config.migration.import_notification.url.clone(),
		config.migration.import_notification.timeout,
	));

	let state_machine = Arc::new(ImportStateMachine::new(
		namespaces as Arc<dyn registry_core::NamespaceStore>,
		Arc::clone(&repositories) as Arc<dyn registry_core::RepositoryStore>,
		Arc::clone(&old_side) as Arc<dyn registry_core::StorageDriver>,
		gate,
		importer,
		notifier,
		config.migration.pre_import_timeout,
		config.migration.import_timeout,
	));

	let rename_coordinator = Arc::new(RenameCoordinator::new(
		Arc::clone(&repositories) as Arc<dyn registry_core::RepositoryStore>,
		leases,
		DEFAULT_RENAME_TIMEOUT,
	));

	let health = Arc::new(DatabaseHealth::new(pool, redis_pool));

	Ok(Arc::new(AppState {
		repositories: repositories as Arc<dyn registry_core::RepositoryStore>,
		tags: tags as Arc<dyn registry_core::TagStore>,
		blobs: blobs as Arc<dyn registry_core::BlobStore>,
		state_machine,
		rename_coordinator,
		health,
	}))
}
