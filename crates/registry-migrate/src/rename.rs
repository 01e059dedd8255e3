//! `PATCH /gitlab/v1/repositories/<path>`: renames a base repository and
//! bulk-rewrites every descendant path sharing its prefix, serialized
//! against concurrent renames toward the same target via a lease.

use std::sync::Arc;
use std::time::Duration;

use registry_core::{
	path::validate_project_name, Error, LeaseStore, Repository, RepositoryLease, RepositoryPath,
	RepositoryStore, Result,
};

/// Descendant subtrees larger than this are rejected outright, without
/// touching the database.
const MAX_RENAME_SUBTREE: u64 = 1000;

/// Parses the `dry_run` query parameter; absent defaults to `true` so an
/// accidental bare `PATCH` previews rather than mutates.
pub fn parse_dry_run(raw: Option<&str>) -> Result<bool> {
	match raw {
		None => Ok(true),
		Some("true") => Ok(true),
		Some("false") => Ok(false),
		Some(_) => Err(Error::invalid_query_param_type("dry_run")),
	}
}

#[derive(Debug, Clone)]
pub enum RenameOutcome {
	/// The transaction was rolled back; `ttl` is the lease's remaining
	/// lifetime at the moment of preview.
	DryRun { ttl: Duration },
	Committed,
}

pub struct RenameCoordinator {
	repositories: Arc<dyn RepositoryStore>,
	leases: Option<Arc<dyn LeaseStore>>,
	default_rename_timeout: Duration,
}

impl RenameCoordinator {
	pub fn new(
		repositories: Arc<dyn RepositoryStore>,
		leases: Option<Arc<dyn LeaseStore>>,
		default_rename_timeout: Duration,
	) -> Self {
		Self {
			repositories,
			leases,
			default_rename_timeout,
		}
	}

	pub async fn rename(&self, path: &RepositoryPath, new_name: &str, dry_run: bool) -> Result<RenameOutcome> {
		validate_project_name(new_name)?;

		let Some(leases) = &self.leases else {
			return Err(Error::not_implemented("a lease cache (redis.url)"));
		};

		let existing = self.repositories.find_by_path(path).await?;
		let descendant_count = self.repositories.count_descendants(path).await?;

		if existing.is_none() && descendant_count == 0 {
			return Err(Error::name_unknown(path.as_str()));
		}
		if descendant_count > MAX_RENAME_SUBTREE {
			return Err(Error::exceeds_limit(format!(
				"subtree of {path} has {descendant_count} repositories, exceeding the limit of {MAX_RENAME_SUBTREE}"
			)));
		}

		let new_path = sibling_path(path, new_name)?;
		if self.repositories.find_by_path(&new_path).await?.is_some() {
			return Err(Error::rename_conflict(format!("a repository already exists at {new_path}")));
		}
		if self.repositories.count_descendants(&new_path).await? > 0 {
			return Err(Error::rename_conflict(format!("{new_path} already has descendants")));
		}

		let requested = RepositoryLease::new(new_path.clone(), path.clone(), self.default_rename_timeout);
		let granted = leases
			.upsert(requested, self.default_rename_timeout)
			.await?
			.ok_or_else(|| Error::rename_conflict(format!("{new_path} is already leased by another rename")))?;

		if dry_run {
			return Ok(RenameOutcome::DryRun { ttl: granted.remaining_ttl() });
		}

		let txn_timeout = self.default_rename_timeout.min(granted.remaining_ttl());
		let result = tokio::time::timeout(txn_timeout, self.commit(path, &new_path, existing)).await;
		let _ = leases.destroy(&new_path, path).await;

		match result {
			Ok(inner) => inner?,
			Err(_) => return Err(Error::DeadlineExceeded),
		}

		Ok(RenameOutcome::Committed)
	}

	async fn commit(&self, path: &RepositoryPath, new_path: &RepositoryPath, existing: Option<Repository>) -> Result<()> {
		if existing.is_some() {
			self.repositories.rename(path, new_path).await?;
		}
		self.repositories.rewrite_descendant_paths(path, new_path).await?;
		Ok(())
	}
}

/// `path` with its last segment replaced by `new_name`.
fn sibling_path(path: &RepositoryPath, new_name: &str) -> Result<RepositoryPath> {
	let full = match path.as_str().rsplit_once('/') {
		Some((parent, _)) => format!("{parent}/{new_name}"),
		None => new_name.to_string(),
	};
	RepositoryPath::parse(&full)
}

#[cfg(test)]
mod tests {
	use super::*;
	use registry_core::MigrationStatus;
	use registry_db::memory::{InMemoryLeaseStore, InMemoryRepositoryStore};
	use uuid::Uuid;

	fn path(s: &str) -> RepositoryPath {
		RepositoryPath::parse(s).unwrap()
	}

	fn coordinator(repositories: Arc<InMemoryRepositoryStore>, leases: Arc<InMemoryLeaseStore>) -> RenameCoordinator {
		RenameCoordinator::new(repositories, Some(leases), Duration::from_secs(30))
	}

	#[tokio::test]
	async fn dry_run_previews_without_mutating_anything() {
		let repositories = Arc::new(InMemoryRepositoryStore::new());
		repositories
			.upsert(Repository::new(path("foo/bar"), Uuid::new_v4(), MigrationStatus::Native))
			.await
			.unwrap();
		let leases = Arc::new(InMemoryLeaseStore::new());
		let coordinator = coordinator(Arc::clone(&repositories), leases);

		let outcome = coordinator.rename(&path("foo/bar"), "not-bar", true).await.unwrap();
		assert!(matches!(outcome, RenameOutcome::DryRun { .. }));
		assert!(repositories.find_by_path(&path("foo/bar")).await.unwrap().is_some());
		assert!(repositories.find_by_path(&path("foo/not-bar")).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn commit_moves_the_base_and_its_descendants() {
		let repositories = Arc::new(InMemoryRepositoryStore::new());
		let ns = Uuid::new_v4();
		for p in ["foo/bar", "foo/bar/baz"] {
			repositories.upsert(Repository::new(path(p), ns, MigrationStatus::Native)).await.unwrap();
		}
		let leases = Arc::new(InMemoryLeaseStore::new());
		let coordinator = coordinator(Arc::clone(&repositories), leases);

		let outcome = coordinator.rename(&path("foo/bar"), "renamed", false).await.unwrap();
		assert!(matches!(outcome, RenameOutcome::Committed));
		assert!(repositories.find_by_path(&path("foo/bar")).await.unwrap().is_none());
		assert!(repositories.find_by_path(&path("foo/renamed")).await.unwrap().is_some());
		assert!(repositories.find_by_path(&path("foo/renamed/baz")).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn a_lease_held_by_another_source_is_a_conflict() {
		let repositories = Arc::new(InMemoryRepositoryStore::new());
		repositories.upsert(Repository::new(path("foo/bar"), Uuid::new_v4(), MigrationStatus::Native)).await.unwrap();
		repositories.upsert(Repository::new(path("foo/foo"), Uuid::new_v4(), MigrationStatus::Native)).await.unwrap();
		let leases = Arc::new(InMemoryLeaseStore::new());
		let coordinator = coordinator(Arc::clone(&repositories), Arc::clone(&leases));

		let first = coordinator.rename(&path("foo/bar"), "not-bar", true).await.unwrap();
		assert!(matches!(first, RenameOutcome::DryRun { .. }));

		let second = coordinator.rename(&path("foo/foo"), "not-bar", true).await;
		assert!(matches!(second, Err(Error::Conflict { .. })));
	}

	#[tokio::test]
	async fn rejects_a_target_name_that_already_exists() {
		let repositories = Arc::new(InMemoryRepositoryStore::new());
		repositories.upsert(Repository::new(path("foo/bar"), Uuid::new_v4(), MigrationStatus::Native)).await.unwrap();
		repositories.upsert(Repository::new(path("foo/taken"), Uuid::new_v4(), MigrationStatus::Native)).await.unwrap();
		let leases = Arc::new(InMemoryLeaseStore::new());
		let coordinator = coordinator(Arc::clone(&repositories), leases);

		let err = coordinator.rename(&path("foo/bar"), "taken", true).await.unwrap_err();
		assert!(matches!(err, Error::Conflict { .. }));
	}

	#[tokio::test]
	async fn rejects_an_unconfigured_lease_backend() {
		let repositories = Arc::new(InMemoryRepositoryStore::new());
		repositories.upsert(Repository::new(path("foo/bar"), Uuid::new_v4(), MigrationStatus::Native)).await.unwrap();
		let coordinator = RenameCoordinator::new(repositories, None, Duration::from_secs(30));

		let err = coordinator.rename(&path("foo/bar"), "not-bar", true).await.unwrap_err();
		assert!(matches!(err, Error::Unavailable { .. }));
	}

	#[test]
	fn dry_run_parsing_defaults_to_true_and_rejects_garbage() {
		assert!(parse_dry_run(None).unwrap());
		assert!(parse_dry_run(Some("true")).unwrap());
		assert!(!parse_dry_run(Some("false")).unwrap());
		assert!(parse_dry_run(Some("yes")).is_err());
	}
}
