//! Decides, per request, whether the old or new code path serves a
//! repository, and the `Gitlab-Migration-Path` value the response should
//! carry.

use registry_core::MigrationStatus;

/// Which storage prefix a request should be served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
	Old,
	New,
}

impl Route {
	/// The literal value the `Gitlab-Migration-Path` response header carries.
	pub fn header_value(self) -> &'static str {
		match self {
			Route::Old => "old",
			Route::New => "new",
		}
	}
}

/// Selects a [`Route`] for a repository from its current (optional)
/// migration status. Reads and writes obey the same rule: the old side
/// remains authoritative until an import fully completes, so an
/// in-progress worker's snapshot is never invalidated mid-flight.
pub fn select_route(status: Option<MigrationStatus>) -> Route {
	match status {
		Some(status) if status.is_on_database() => Route::New,
		_ => Route::Old,
	}
}
