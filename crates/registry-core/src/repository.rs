//! The repository row: the unit the migration state machine drives.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::migration_status::MigrationStatus;
use crate::path::RepositoryPath;

/// A repository, identified by its slash-delimited [`RepositoryPath`].
///
/// Absence of a row is a distinct, meaningful state ("not yet known to the
/// new side") — see `MigrationStatus` — so this type is never constructed
/// speculatively; stores return `Option<Repository>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
	pub id: Uuid,
	pub path: RepositoryPath,
	pub namespace_id: Uuid,
	pub migration_status: MigrationStatus,
	pub migration_error: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Repository {
	/// The last path segment, per the data model's `name = suffix of path`
	/// invariant.
	pub fn name(&self) -> &str {
		self.path.name()
	}

	/// Constructs a freshly-created row for `path`, in the given initial
	/// status, belonging to `namespace_id`.
	pub fn new(path: RepositoryPath, namespace_id: Uuid, migration_status: MigrationStatus) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			path,
			namespace_id,
			migration_status,
			migration_error: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Transitions this row to `status`, clearing `migration_error`
	/// unconditionally on success and setting it on failure.
	///
	/// Successful terminal transitions always clear a stale error left over
	/// from a prior failed attempt (see `SPEC_FULL.md` §9 Open Questions).
	pub fn transition(&mut self, status: MigrationStatus, error: Option<String>) {
		self.migration_status = status;
		self.migration_error = error;
		self.updated_at = Utc::now();
	}
}
