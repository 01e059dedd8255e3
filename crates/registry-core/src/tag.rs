//! The mutable `(repository, name) -> manifest digest` mapping.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::digest::Digest;

/// A tag. `name` must match [`crate::path::tag_name_regex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
	pub repository_id: Uuid,
	pub name: String,
	pub manifest_digest: Digest,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Tag {
	pub fn new(repository_id: Uuid, name: impl Into<String>, manifest_digest: Digest) -> Self {
		let now = Utc::now();
		Self {
			repository_id,
			name: name.into(),
			manifest_digest,
			created_at: now,
			updated_at: now,
		}
	}
}
