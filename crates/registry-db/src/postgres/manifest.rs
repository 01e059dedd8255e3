use async_trait::async_trait;
use chrono::{DateTime, Utc};
use registry_core::{Digest, Error, Manifest, ManifestReference, ManifestStore, MediaType, ReferenceKind};
use sea_query::{Expr, Iden, OnConflict, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;

#[derive(Iden)]
enum Manifests {
	Table,
	Id,
	RepositoryId,
	Digest,
	MediaType,
	ByteSize,
	CreatedAt,
}

#[derive(Iden)]
enum ManifestReferences {
	Table,
	ParentManifestId,
	ChildDigest,
	Kind,
}

#[derive(sqlx::FromRow)]
struct ManifestRow {
	id: Uuid,
	repository_id: Uuid,
	digest: String,
	media_type: String,
	byte_size: i64,
	created_at: DateTime<Utc>,
}

fn parse_media_type(raw: &str) -> Result<MediaType, Error> {
	match raw {
		"application/vnd.docker.distribution.manifest.v2+json" => Ok(MediaType::DockerManifestV2),
		"application/vnd.docker.distribution.manifest.list.v2+json" => Ok(MediaType::DockerManifestList),
		"application/vnd.oci.image.manifest.v1+json" => Ok(MediaType::OciImageManifest),
		"application/vnd.oci.image.index.v1+json" => Ok(MediaType::OciImageIndex),
		other => Err(Error::Internal(format!("unrecognized stored media type: {other:?}"))),
	}
}

impl TryFrom<ManifestRow> for Manifest {
	type Error = Error;

	fn try_from(row: ManifestRow) -> Result<Self, Self::Error> {
		Ok(Manifest {
			id: row.id,
			repository_id: row.repository_id,
			digest: row.digest.parse().map_err(|e: registry_core::digest::DigestParseError| Error::Internal(e.to_string()))?,
			media_type: parse_media_type(&row.media_type)?,
			byte_size: row.byte_size as u64,
			created_at: row.created_at,
		})
	}
}

/// Manifests and manifest-graph edges stored in Postgres.
#[derive(Debug, Clone)]
pub struct PostgresManifestStore {
	pool: PgPool,
}

impl PostgresManifestStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	fn columns() -> [Manifests; 6] {
		[
			Manifests::Id,
			Manifests::RepositoryId,
			Manifests::Digest,
			Manifests::MediaType,
			Manifests::ByteSize,
			Manifests::CreatedAt,
		]
	}
}

#[async_trait]
impl ManifestStore for PostgresManifestStore {
	async fn find_by_digest(&self, repository_id: Uuid, digest: &Digest) -> Result<Option<Manifest>, Error> {
		let (sql, values) = Query::select()
			.columns(Self::columns())
			.from(Manifests::Table)
			.and_where(Expr::col(Manifests::RepositoryId).eq(repository_id))
			.and_where(Expr::col(Manifests::Digest).eq(digest.as_str()))
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, ManifestRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_error)?;
		row.map(Manifest::try_from).transpose()
	}

	async fn upsert(&self, manifest: Manifest) -> Result<Manifest, Error> {
		let (sql, values) = Query::insert()
			.into_table(Manifests::Table)
			.columns(Self::columns())
			.values_panic([
				manifest.id.into(),
				manifest.repository_id.into(),
				manifest.digest.as_str().into(),
				manifest.media_type.as_str().into(),
				(manifest.byte_size as i64).into(),
				manifest.created_at.into(),
			])
			.on_conflict(
				OnConflict::columns([Manifests::RepositoryId, Manifests::Digest])
					.do_nothing()
					.to_owned(),
			)
			.returning_all()
			.build_sqlx(PostgresQueryBuilder);

		let row = sqlx::query_as_with::<_, ManifestRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_error)?;
		match row {
			Some(row) => Manifest::try_from(row),
			None => self
				.find_by_digest(manifest.repository_id, &manifest.digest)
				.await?
				.ok_or_else(|| Error::Internal("manifest vanished after conflicting insert".to_string())),
		}
	}

	async fn add_reference(&self, reference: ManifestReference) -> Result<(), Error> {
		let kind = match reference.kind {
			ReferenceKind::Manifest => "manifest",
			ReferenceKind::Blob => "blob",
		};
		let (sql, values) = Query::insert()
			.into_table(ManifestReferences::Table)
			.columns([
				ManifestReferences::ParentManifestId,
				ManifestReferences::ChildDigest,
				ManifestReferences::Kind,
			])
			.values_panic([reference.parent_manifest_id.into(), reference.child_digest.as_str().into(), kind.into()])
			.on_conflict(
				OnConflict::columns([ManifestReferences::ParentManifestId, ManifestReferences::ChildDigest])
					.do_nothing()
					.to_owned(),
			)
			.build_sqlx(PostgresQueryBuilder);

		sqlx::query_with(&sql, values).execute(&self.pool).await.map_err(db_error)?;
		Ok(())
	}

	async fn references_of(&self, manifest_id: Uuid) -> Result<Vec<ManifestReference>, Error> {
		let (sql, values) = Query::select()
			.columns([
				ManifestReferences::ParentManifestId,
				ManifestReferences::ChildDigest,
				ManifestReferences::Kind,
			])
			.from(ManifestReferences::Table)
			.and_where(Expr::col(ManifestReferences::ParentManifestId).eq(manifest_id))
			.build_sqlx(PostgresQueryBuilder);

		#[derive(sqlx::FromRow)]
		struct ReferenceRow {
			parent_manifest_id: Uuid,
			child_digest: String,
			kind: String,
		}

		let rows = sqlx::query_as_with::<_, ReferenceRow, _>(&sql, values)
			.fetch_all(&self.pool)
			.await
			.map_err(db_error)?;

		rows.into_iter()
			.map(|row| {
				Ok(ManifestReference {
					parent_manifest_id: row.parent_manifest_id,
					child_digest: row
						.child_digest
						.parse()
						.map_err(|e: registry_core::digest::DigestParseError| Error::Internal(e.to_string()))?,
					kind: match row.kind.as_str() {
						"manifest" => ReferenceKind::Manifest,
						_ => ReferenceKind::Blob,
					},
				})
			})
			.collect()
	}
}
