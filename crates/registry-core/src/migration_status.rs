//! The closed set of states a repository's migration can be in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A repository's migration status, persisted as text on the repository row.
///
/// Modeled as a tagged variant rather than a free-form string at the domain
/// layer (SPEC_FULL.md §9); [`MigrationStatus::as_str`] / [`FromStr`] are the
/// only places that touch the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MigrationStatus {
	Native,
	ImportInProgress,
	ImportComplete,
	ImportFailed,
	PreImportInProgress,
	PreImportComplete,
	PreImportFailed,
}

impl MigrationStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			MigrationStatus::Native => "native",
			MigrationStatus::ImportInProgress => "import_in_progress",
			MigrationStatus::ImportComplete => "import_complete",
			MigrationStatus::ImportFailed => "import_failed",
			MigrationStatus::PreImportInProgress => "pre_import_in_progress",
			MigrationStatus::PreImportComplete => "pre_import_complete",
			MigrationStatus::PreImportFailed => "pre_import_failed",
		}
	}

	/// `true` once reads and writes for the owning repository must use the
	/// new-side code path exclusively ("on database" per SPEC_FULL.md §3).
	pub fn is_on_database(self) -> bool {
		matches!(self, MigrationStatus::Native | MigrationStatus::ImportComplete)
	}

	pub fn is_in_progress(self) -> bool {
		matches!(
			self,
			MigrationStatus::ImportInProgress | MigrationStatus::PreImportInProgress
		)
	}

	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			MigrationStatus::ImportComplete
				| MigrationStatus::ImportFailed
				| MigrationStatus::PreImportComplete
				| MigrationStatus::PreImportFailed
		)
	}
}

impl fmt::Display for MigrationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a stored `migration_status` string is not recognized.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unrecognized migration status: {0:?}")]
pub struct UnknownMigrationStatus(pub String);

impl FromStr for MigrationStatus {
	type Err = UnknownMigrationStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"native" => MigrationStatus::Native,
			"import_in_progress" => MigrationStatus::ImportInProgress,
			"import_complete" => MigrationStatus::ImportComplete,
			"import_failed" => MigrationStatus::ImportFailed,
			"pre_import_in_progress" => MigrationStatus::PreImportInProgress,
			"pre_import_complete" => MigrationStatus::PreImportComplete,
			"pre_import_failed" => MigrationStatus::PreImportFailed,
			other => return Err(UnknownMigrationStatus(other.to_string())),
		})
	}
}

impl TryFrom<String> for MigrationStatus {
	type Error = UnknownMigrationStatus;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<MigrationStatus> for String {
	fn from(value: MigrationStatus) -> Self {
		value.as_str().to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn on_database_only_for_native_and_complete() {
		assert!(MigrationStatus::Native.is_on_database());
		assert!(MigrationStatus::ImportComplete.is_on_database());
		assert!(!MigrationStatus::PreImportComplete.is_on_database());
		assert!(!MigrationStatus::ImportInProgress.is_on_database());
		assert!(!MigrationStatus::ImportFailed.is_on_database());
	}

	#[test]
	fn round_trips_through_str() {
		for status in [
			MigrationStatus::Native,
			MigrationStatus::ImportInProgress,
			MigrationStatus::ImportComplete,
			MigrationStatus::ImportFailed,
			MigrationStatus::PreImportInProgress,
			MigrationStatus::PreImportComplete,
			MigrationStatus::PreImportFailed,
		] {
			assert_eq!(status.as_str().parse::<MigrationStatus>().unwrap(), status);
		}
	}

	#[test]
	fn rejects_unknown_strings() {
		assert_eq!(
			"bogus".parse::<MigrationStatus>().unwrap_err(),
			UnknownMigrationStatus("bogus".to_string())
		);
	}
}
