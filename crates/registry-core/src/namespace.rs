//! The top-level path segment that groups repositories.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A namespace, created on demand the first time a repository is addressed
/// under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
	pub id: Uuid,
	pub name: String,
	pub created_at: DateTime<Utc>,
}

impl Namespace {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			id: Uuid::new_v4(),
			name: name.into(),
			created_at: Utc::now(),
		}
	}
}
