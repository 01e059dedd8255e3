//! Content-addressed blob metadata and the repository↔blob link relation.

use chrono::{DateTime, Utc};

use crate::digest::Digest;

/// A blob known to the new side, identified by its digest. Immutable once
/// created; existence of a [`BlobLink`] implies the content is reachable
/// from the new-side storage driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
	pub digest: Digest,
	pub size_bytes: u64,
	pub created_at: DateTime<Utc>,
}

impl Blob {
	pub fn new(digest: Digest, size_bytes: u64) -> Self {
		Self {
			digest,
			size_bytes,
			created_at: Utc::now(),
		}
	}
}

/// A many-to-many link between a repository and a blob it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLink {
	pub repository_id: uuid::Uuid,
	pub digest: Digest,
}
