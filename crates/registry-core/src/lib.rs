//! Domain types, capability traits, and the error taxonomy shared by every
//! component of the repository migration control plane.
//!
//! This crate has no I/O of its own: `registry-storage` and `registry-db`
//! implement the [`StorageDriver`] and `*Store` traits declared here, and
//! `registry-migrate`/`registry-http` consume them.

pub mod blob;
pub mod digest;
pub mod error;
pub mod lease;
pub mod manifest;
pub mod metrics;
pub mod migration_status;
pub mod namespace;
pub mod pagination;
pub mod path;
pub mod repository;
pub mod storage;
pub mod store;
pub mod tag;

pub use blob::{Blob, BlobLink};
pub use digest::Digest;
pub use error::{Error, ErrorCode, Result, ResultExt};
pub use lease::RepositoryLease;
pub use manifest::{Manifest, ManifestReference, MediaType, ReferenceKind};
pub use metrics::{MetricsSink, NoopMetricsSink};
pub use migration_status::MigrationStatus;
pub use namespace::Namespace;
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use path::RepositoryPath;
pub use repository::Repository;
pub use storage::{
	blob_key, manifest_key, manifest_revisions_prefix, tag_current_link_key, tags_prefix, ObjectKey,
	StorageDriver, StorageError,
};
pub use store::{BlobStore, LeaseStore, ManifestStore, NamespaceStore, RepositoryStore, TagStore};
pub use tag::Tag;
