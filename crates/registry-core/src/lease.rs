//! Ephemeral rename leases: atomic upsert-with-TTL tokens keyed by path.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::path::RepositoryPath;

/// An exclusive, time-limited grant of a target path to a source path,
/// used to serialize concurrent renames toward the same destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLease {
	pub target_path: RepositoryPath,
	pub granted_to: RepositoryPath,
	pub expires_at: DateTime<Utc>,
}

impl RepositoryLease {
	pub fn new(target_path: RepositoryPath, granted_to: RepositoryPath, ttl: Duration) -> Self {
		Self {
			target_path,
			granted_to,
			expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()),
		}
	}

	/// Remaining time before this lease expires, or `Duration::ZERO` if it
	/// already has.
	pub fn remaining_ttl(&self) -> Duration {
		(self.expires_at - Utc::now())
			.to_std()
			.unwrap_or(Duration::ZERO)
	}

	pub fn is_expired(&self) -> bool {
		self.expires_at <= Utc::now()
	}
}
