use async_trait::async_trait;
use chrono::{DateTime, Utc};
use registry_core::{Error, Page, PageRequest, Tag, TagStore};
use sea_query::{Expr, Iden, Order, OnConflict, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;

#[derive(Iden)]
enum Tags {
	Table,
	RepositoryId,
	Name,
	ManifestDigest,
	CreatedAt,
	UpdatedAt,
}

#[derive(sqlx::FromRow)]
struct TagRow {
	repository_id: Uuid,
	name: String,
	manifest_digest: String,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
}

impl TryFrom<TagRow> for Tag {
	type Error = Error;

	fn try_from(row: TagRow) -> Result<Self, Self::Error> {
		Ok(Tag {
			repository_id: row.repository_id,
			name: row.name,
			manifest_digest: row
				.manifest_digest
				.parse()
				.map_err(|e: registry_core::digest::DigestParseError| Error::Internal(e.to_string()))?,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

/// Tags stored in Postgres.
#[derive(Debug, Clone)]
pub struct PostgresTagStore {
	pool: PgPool,
}

impl PostgresTagStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	fn columns() -> [Tags; 5] {
		[Tags::RepositoryId, Tags::Name, Tags::ManifestDigest, Tags::CreatedAt, Tags::UpdatedAt]
	}
}

#[async_trait]
impl TagStore for PostgresTagStore {
	async fn find(&self, repository_id: Uuid, name: &str) -> Result<Option<Tag>, Error> {
		let (sql, values) = Query::select()
			.columns(Self::columns())
			.from(Tags::Table)
			.and_where(Expr::col(Tags::RepositoryId).eq(repository_id))
			.and_where(Expr::col(Tags::Name).eq(name))
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, TagRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_error)?;
		row.map(Tag::try_from).transpose()
	}

	async fn upsert(&self, tag: Tag) -> Result<Tag, Error> {
		let (sql, values) = Query::insert()
			.into_table(Tags::Table)
			.columns(Self::columns())
			.values_panic([
				tag.repository_id.into(),
				tag.name.clone().into(),
				tag.manifest_digest.as_str().into(),
				tag.created_at.into(),
				tag.updated_at.into(),
			])
			.on_conflict(
				OnConflict::columns([Tags::RepositoryId, Tags::Name])
					.update_columns([Tags::ManifestDigest, Tags::UpdatedAt])
					.to_owned(),
			)
			.returning_all()
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, TagRow, _>(&sql, values)
			.fetch_one(&self.pool)
			.await
			.map_err(db_error)?;
		Tag::try_from(row)
	}

	async fn list(&self, repository_id: Uuid, page: &PageRequest) -> Result<Page<Tag>, Error> {
		let mut query = Query::select();
		query
			.columns(Self::columns())
			.from(Tags::Table)
			.and_where(Expr::col(Tags::RepositoryId).eq(repository_id))
			.order_by(Tags::Name, Order::Asc)
			// fetch one extra row so `has_more` can be computed without a second query
			.limit(page.n as u64 + 1);

		if let Some(last) = &page.last {
			query.and_where(Expr::col(Tags::Name).gt(last.as_str()));
		}
		if let Some(name) = &page.name {
			query.and_where(Expr::col(Tags::Name).like(format!("{name}%")));
		}

		let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
		let rows = sqlx::query_as_with::<_, TagRow, _>(&sql, values)
			.fetch_all(&self.pool)
			.await
			.map_err(db_error)?;

		let has_more = rows.len() > page.n as usize;
		let items = rows
			.into_iter()
			.take(page.n as usize)
			.map(Tag::try_from)
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Page { items, has_more })
	}
}
