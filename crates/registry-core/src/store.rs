//! One capability trait per entity. The importer and HTTP handlers depend
//! only on these; Postgres-backed implementations and in-memory fakes both
//! live in `registry-db`.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::blob::{Blob, BlobLink};
use crate::digest::Digest;
use crate::error::Result;
use crate::lease::RepositoryLease;
use crate::manifest::{Manifest, ManifestReference};
use crate::namespace::Namespace;
use crate::pagination::{Page, PageRequest};
use crate::path::RepositoryPath;
use crate::repository::Repository;
use crate::tag::Tag;

#[async_trait]
pub trait NamespaceStore: Send + Sync {
	async fn find_by_name(&self, name: &str) -> Result<Option<Namespace>>;

	/// Returns the existing namespace named `name`, creating it if absent.
	async fn get_or_create(&self, name: &str) -> Result<Namespace>;
}

#[async_trait]
pub trait RepositoryStore: Send + Sync {
	async fn find_by_path(&self, path: &RepositoryPath) -> Result<Option<Repository>>;

	/// Inserts `repository`, or updates the existing row sharing its path.
	async fn upsert(&self, repository: Repository) -> Result<Repository>;

	/// Renames `path` to `new_path` in place, returning the updated row.
	/// `Ok(None)` if no row exists at `path`.
	async fn rename(&self, path: &RepositoryPath, new_path: &RepositoryPath) -> Result<Option<Repository>>;

	/// Every repository whose path is a strict descendant of `prefix`.
	async fn find_descendants(&self, prefix: &RepositoryPath) -> Result<Vec<Repository>>;

	/// Count of strict descendants of `prefix`, without materializing them;
	/// used for the 1000-subtree limit without paying for a full scan.
	async fn count_descendants(&self, prefix: &RepositoryPath) -> Result<u64>;

	/// Rewrites the path of every strict descendant of `old_prefix` by
	/// substituting `new_prefix`, as part of a rename transaction.
	async fn rewrite_descendant_paths(
		&self,
		old_prefix: &RepositoryPath,
		new_prefix: &RepositoryPath,
	) -> Result<u64>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
	async fn find_by_digest(&self, digest: &Digest) -> Result<Option<Blob>>;

	async fn upsert(&self, blob: Blob) -> Result<Blob>;

	/// Idempotently records that `repository_id` references `digest`.
	async fn link(&self, link: BlobLink) -> Result<()>;

	async fn is_linked(&self, repository_id: Uuid, digest: &Digest) -> Result<bool>;

	/// Sum of `size_bytes` over every distinct blob linked to `repository_id`;
	/// backs `GET …/repositories/<path>?size=self`.
	async fn total_size(&self, repository_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait ManifestStore: Send + Sync {
	async fn find_by_digest(&self, repository_id: Uuid, digest: &Digest) -> Result<Option<Manifest>>;

	async fn upsert(&self, manifest: Manifest) -> Result<Manifest>;

	async fn add_reference(&self, reference: ManifestReference) -> Result<()>;

	async fn references_of(&self, manifest_id: Uuid) -> Result<Vec<ManifestReference>>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
	async fn find(&self, repository_id: Uuid, name: &str) -> Result<Option<Tag>>;

	/// Inserts or overwrites the `(repository, name)` row, per the tag
	/// mapping's mutability.
	async fn upsert(&self, tag: Tag) -> Result<Tag>;

	async fn list(&self, repository_id: Uuid, page: &PageRequest) -> Result<Page<Tag>>;
}

#[async_trait]
pub trait LeaseStore: Send + Sync {
	async fn find_by_path(&self, target_path: &RepositoryPath) -> Result<Option<RepositoryLease>>;

	/// Grants `lease` if no unexpired lease exists for its target path, or
	/// refreshes the TTL if the existing lease already names the same
	/// `granted_to`. Returns `Ok(None)` if a conflicting lease is held by a
	/// different source.
	async fn upsert(&self, lease: RepositoryLease, ttl: Duration) -> Result<Option<RepositoryLease>>;

	/// Best-effort release; not finding the lease is not an error.
	async fn destroy(&self, target_path: &RepositoryPath, granted_to: &RepositoryPath) -> Result<()>;
}
