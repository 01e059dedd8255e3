use async_trait::async_trait;
use chrono::{DateTime, Utc};
use registry_core::{Error, MigrationStatus, Repository, RepositoryPath, RepositoryStore};
use sea_query::{Expr, Iden, OnConflict, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;

#[derive(Iden)]
enum Repositories {
	Table,
	Id,
	Path,
	NamespaceId,
	MigrationStatus,
	MigrationError,
	CreatedAt,
	UpdatedAt,
}

#[derive(sqlx::FromRow)]
struct RepositoryRow {
	id: Uuid,
	path: String,
	namespace_id: Uuid,
	migration_status: String,
	migration_error: Option<String>,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
}

impl TryFrom<RepositoryRow> for Repository {
	type Error = Error;

	fn try_from(row: RepositoryRow) -> Result<Self, Self::Error> {
		Ok(Repository {
			id: row.id,
			path: RepositoryPath::parse(&row.path)?,
			namespace_id: row.namespace_id,
			migration_status: row
				.migration_status
				.parse::<MigrationStatus>()
				.map_err(|e| Error::Internal(e.to_string()))?,
			migration_error: row.migration_error,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

/// Repository rows stored in Postgres.
#[derive(Debug, Clone)]
pub struct PostgresRepositoryStore {
	pool: PgPool,
}

impl PostgresRepositoryStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	fn columns() -> [Repositories; 7] {
		[
			Repositories::Id,
			Repositories::Path,
			Repositories::NamespaceId,
			Repositories::MigrationStatus,
			Repositories::MigrationError,
			Repositories::CreatedAt,
			Repositories::UpdatedAt,
		]
	}
}

#[async_trait]
impl RepositoryStore for PostgresRepositoryStore {
	async fn find_by_path(&self, path: &RepositoryPath) -> Result<Option<Repository>, Error> {
		let (sql, values) = Query::select()
			.columns(Self::columns())
			.from(Repositories::Table)
			.and_where(Expr::col(Repositories::Path).eq(path.as_str()))
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, RepositoryRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_error)?;
		row.map(Repository::try_from).transpose()
	}

	async fn upsert(&self, repository: Repository) -> Result<Repository, Error> {
		let (sql, values) = Query::insert()
			.into_table(Repositories::Table)
			.columns(Self::columns())
			.values_panic([
				repository.id.into(),
				repository.path.as_str().into(),
				repository.namespace_id.into(),
				repository.migration_status.as_str().into(),
				repository.migration_error.clone().into(),
				repository.created_at.into(),
				repository.updated_at.into(),
			])
			.on_conflict(
				OnConflict::column(Repositories::Path)
					.update_columns([
						Repositories::MigrationStatus,
						Repositories::MigrationError,
						Repositories::UpdatedAt,
					])
					.to_owned(),
			)
			.returning_all()
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, RepositoryRow, _>(&sql, values)
			.fetch_one(&self.pool)
			.await
			.map_err(db_error)?;
		Repository::try_from(row)
	}

	async fn rename(&self, path: &RepositoryPath, new_path: &RepositoryPath) -> Result<Option<Repository>, Error> {
		let (sql, values) = Query::update()
			.table(Repositories::Table)
			.value(Repositories::Path, new_path.as_str())
			.and_where(Expr::col(Repositories::Path).eq(path.as_str()))
			.returning_all()
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, RepositoryRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_error)?;
		row.map(Repository::try_from).transpose()
	}

	async fn find_descendants(&self, prefix: &RepositoryPath) -> Result<Vec<Repository>, Error> {
		let (sql, values) = Query::select()
			.columns(Self::columns())
			.from(Repositories::Table)
			.and_where(Expr::col(Repositories::Path).like(format!("{prefix}/%")))
			.build_sqlx(PostgresQueryBuilder);

		let rows = sqlx::query_as_with::<_, RepositoryRow, _>(&sql, values)
			.fetch_all(&self.pool)
			.await
			.map_err(db_error)?;
		rows.into_iter().map(Repository::try_from).collect()
	}

	async fn count_descendants(&self, prefix: &RepositoryPath) -> Result<u64, Error> {
		let (sql, values) = Query::select()
			.expr(Expr::col(Repositories::Id).count())
			.from(Repositories::Table)
			.and_where(Expr::col(Repositories::Path).like(format!("{prefix}/%")))
			.build_sqlx(PostgresQueryBuilder);

		let (count,): (i64,) = sqlx::query_as_with(&sql, values)
			.fetch_one(&self.pool)
			.await
			.map_err(db_error)?;
		Ok(count as u64)
	}

	async fn rewrite_descendant_paths(
		&self,
		old_prefix: &RepositoryPath,
		new_prefix: &RepositoryPath,
	) -> Result<u64, Error> {
		// Postgres lacks a portable "replace leading substring" builder in
		// sea-query, so this relies on `overlay`/`substring` via a raw
		// expression; simpler and just as correct to do it in two steps
		// given the bounded subtree size already enforced by the caller.
		let descendants = self.find_descendants(old_prefix).await?;
		let mut rewritten = 0u64;
		for descendant in descendants {
			let suffix = &descendant.path.as_str()[old_prefix.as_str().len()..];
			let new_path = RepositoryPath::parse(&format!("{new_prefix}{suffix}"))?;
			self.rename(&descendant.path, &new_path).await?;
			rewritten += 1;
		}
		Ok(rewritten)
	}
}
