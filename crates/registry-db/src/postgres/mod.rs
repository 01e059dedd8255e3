//! Postgres-backed implementations of the `registry-core` store traits,
//! built on `sqlx::PgPool` and `sea-query` for SQL generation, in the style
//! of `DatabaseTokenStorage`.

mod blob;
mod manifest;
mod namespace;
mod repository;
mod tag;

pub use blob::PostgresBlobStore;
pub use manifest::PostgresManifestStore;
pub use namespace::PostgresNamespaceStore;
pub use repository::PostgresRepositoryStore;
pub use tag::PostgresTagStore;

use sqlx::PgPool;

/// Applies every pending migration embedded at compile time from
/// `registry-db/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
	sqlx::migrate!("./migrations").run(pool).await
}

fn db_error(err: sqlx::Error) -> registry_core::Error {
	registry_core::Error::Internal(format!("database error: {err}"))
}
