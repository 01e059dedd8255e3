use async_trait::async_trait;
use chrono::{DateTime, Utc};
use registry_core::{Error, Namespace, NamespaceStore};
use sea_query::{Expr, Iden, OnConflict, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;

#[derive(Iden)]
enum Namespaces {
	Table,
	Id,
	Name,
	CreatedAt,
}

#[derive(sqlx::FromRow)]
struct NamespaceRow {
	id: Uuid,
	name: String,
	created_at: DateTime<Utc>,
}

impl From<NamespaceRow> for Namespace {
	fn from(row: NamespaceRow) -> Self {
		Namespace {
			id: row.id,
			name: row.name,
			created_at: row.created_at,
		}
	}
}

/// Namespaces stored in Postgres, created on demand via an upsert that
/// is a no-op on an existing name.
#[derive(Debug, Clone)]
pub struct PostgresNamespaceStore {
	pool: PgPool,
}

impl PostgresNamespaceStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl NamespaceStore for PostgresNamespaceStore {
	async fn find_by_name(&self, name: &str) -> Result<Option<Namespace>, Error> {
		let (sql, values) = Query::select()
			.columns([Namespaces::Id, Namespaces::Name, Namespaces::CreatedAt])
			.from(Namespaces::Table)
			.and_where(Expr::col(Namespaces::Name).eq(name))
			.build_sqlx(PostgresQueryBuilder);

		sqlx::query_as_with::<_, NamespaceRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map(|row| row.map(Namespace::from))
			.map_err(db_error)
	}

	async fn get_or_create(&self, name: &str) -> Result<Namespace, Error> {
		let namespace = Namespace::new(name);
		let (sql, values) = Query::insert()
			.into_table(Namespaces::Table)
			.columns([Namespaces::Id, Namespaces::Name, Namespaces::CreatedAt])
			.values_panic([namespace.id.into(), namespace.name.clone().into(), namespace.created_at.into()])
			.on_conflict(OnConflict::column(Namespaces::Name).do_nothing().to_owned())
			.returning_all()
			.build_sqlx(PostgresQueryBuilder);

		let inserted = sqlx::query_as_with::<_, NamespaceRow, _>(&sql, values)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_error)?;

		match inserted {
			Some(row) => Ok(row.into()),
			None => self
				.find_by_name(name)
				.await?
				.ok_or_else(|| Error::Internal(format!("namespace {name:?} vanished after conflicting insert"))),
		}
	}
}
