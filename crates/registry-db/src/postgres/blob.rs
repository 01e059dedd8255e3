use async_trait::async_trait;
use chrono::{DateTime, Utc};
use registry_core::{Blob, BlobLink, BlobStore, Digest, Error};
use sea_query::{Expr, Iden, OnConflict, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;

#[derive(Iden)]
enum Blobs {
	Table,
	Digest,
	SizeBytes,
	CreatedAt,
}

#[derive(Iden)]
enum RepositoryBlobs {
	Table,
	RepositoryId,
	Digest,
}

#[derive(sqlx::FromRow)]
struct BlobRow {
	digest: String,
	size_bytes: i64,
	created_at: DateTime<Utc>,
}

impl TryFrom<BlobRow> for Blob {
	type Error = Error;

	fn try_from(row: BlobRow) -> Result<Self, Self::Error> {
		Ok(Blob {
			digest: row.digest.parse().map_err(|e: registry_core::digest::DigestParseError| Error::Internal(e.to_string()))?,
			size_bytes: row.size_bytes as u64,
			created_at: row.created_at,
		})
	}
}

/// Blobs and repository↔blob links stored in Postgres.
#[derive(Debug, Clone)]
pub struct PostgresBlobStore {
	pool: PgPool,
}

impl PostgresBlobStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl BlobStore for PostgresBlobStore {
	async fn find_by_digest(&self, digest: &Digest) -> Result<Option<Blob>, Error> {
		let (sql, values) = Query::select()
			.columns([Blobs::Digest, Blobs::SizeBytes, Blobs::CreatedAt])
			.from(Blobs::Table)
			.and_where(Expr::col(Blobs::Digest).eq(digest.as_str()))
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, BlobRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_error)?;
		row.map(Blob::try_from).transpose()
	}

	async fn upsert(&self, blob: Blob) -> Result<Blob, Error> {
		let (sql, values) = Query::insert()
			.into_table(Blobs::Table)
			.columns([Blobs::Digest, Blobs::SizeBytes, Blobs::CreatedAt])
			.values_panic([blob.digest.as_str().into(), (blob.size_bytes as i64).into(), blob.created_at.into()])
			.on_conflict(OnConflict::column(Blobs::Digest).do_nothing().to_owned())
			.build_sqlx(PostgresQueryBuilder);

		sqlx::query_with(&sql, values).execute(&self.pool).await.map_err(db_error)?;
		Ok(blob)
	}

	async fn link(&self, link: BlobLink) -> Result<(), Error> {
		let (sql, values) = Query::insert()
			.into_table(RepositoryBlobs::Table)
			.columns([RepositoryBlobs::RepositoryId, RepositoryBlobs::Digest])
			.values_panic([link.repository_id.into(), link.digest.as_str().into()])
			.on_conflict(
				OnConflict::columns([RepositoryBlobs::RepositoryId, RepositoryBlobs::Digest])
					.do_nothing()
					.to_owned(),
			)
			.build_sqlx(PostgresQueryBuilder);

		sqlx::query_with(&sql, values).execute(&self.pool).await.map_err(db_error)?;
		Ok(())
	}

	async fn is_linked(&self, repository_id: Uuid, digest: &Digest) -> Result<bool, Error> {
		let (sql, values) = Query::select()
			.expr(Expr::col(RepositoryBlobs::Digest).count())
			.from(RepositoryBlobs::Table)
			.and_where(Expr::col(RepositoryBlobs::RepositoryId).eq(repository_id))
			.and_where(Expr::col(RepositoryBlobs::Digest).eq(digest.as_str()))
			.build_sqlx(PostgresQueryBuilder);

		let (count,): (i64,) = sqlx::query_as_with(&sql, values)
			.fetch_one(&self.pool)
			.await
			.map_err(db_error)?;
		Ok(count > 0)
	}

	async fn total_size(&self, repository_id: Uuid) -> Result<u64, Error> {
		let (sql, values) = Query::select()
			.expr(Expr::col(Blobs::SizeBytes).sum())
			.from(RepositoryBlobs::Table)
			.inner_join(Blobs::Table, Expr::col((RepositoryBlobs::Table, RepositoryBlobs::Digest)).equals((Blobs::Table, Blobs::Digest)))
			.and_where(Expr::col((RepositoryBlobs::Table, RepositoryBlobs::RepositoryId)).eq(repository_id))
			.build_sqlx(PostgresQueryBuilder);

		let (total,): (Option<i64>,) = sqlx::query_as_with(&sql, values)
			.fetch_one(&self.pool)
			.await
			.map_err(db_error)?;
		Ok(total.unwrap_or(0) as u64)
	}
}
