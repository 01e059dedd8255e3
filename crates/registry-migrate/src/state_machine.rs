//! Admission control for `PUT …/import`: decides whether a requested
//! `pre`/`final` import is admitted, short-circuited, or rejected, and
//! dispatches the admitted worker in the background.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use registry_core::{
	Error, MigrationStatus, NamespaceStore, Repository, RepositoryPath, RepositoryStore, Result,
	StorageDriver,
};

use crate::concurrency_gate::ConcurrencyGate;
use crate::importer::Importer;
use crate::notifier::ImportNotifier;

/// The import variant a caller requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportType {
	Pre,
	Final,
}

impl FromStr for ImportType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"pre" => Ok(ImportType::Pre),
			"final" => Ok(ImportType::Final),
			other => Err(Error::invalid_query_param("import_type", other)),
		}
	}
}

/// The result of `PUT …/import` admission.
#[derive(Debug, Clone)]
pub struct StartOutcome {
	/// `false` for the short-circuit ("already on the new side") path; the
	/// HTTP handler replies `200` rather than `202` in that case.
	pub admitted: bool,
	pub repository: Repository,
}

/// The outcome of applying the admission table, before a concurrency slot
/// or a storage existence check has necessarily been validated.
enum Decision {
	Admit(MigrationStatus),
	ShortCircuit,
	Reject(Error),
}

/// Applies the table in `SPEC_FULL.md` §4.1.
fn decide(current: Option<MigrationStatus>, import_type: ImportType) -> Decision {
	use ImportType::{Final, Pre};
	use MigrationStatus::*;

	match (current, import_type) {
		(None, Pre) => Decision::Admit(PreImportInProgress),
		(None, Final) => Decision::Reject(Error::pre_import_required()),

		(Some(PreImportInProgress), _) => Decision::Reject(Error::pre_import_in_progress()),

		(Some(PreImportComplete), Pre) => Decision::Admit(PreImportInProgress),
		(Some(PreImportComplete), Final) => Decision::Admit(ImportInProgress),

		(Some(PreImportFailed), Pre) => Decision::Admit(PreImportInProgress),
		(Some(PreImportFailed), Final) => Decision::Reject(Error::pre_import_failed()),

		(Some(ImportInProgress), _) => Decision::Reject(Error::import_in_progress()),

		(Some(ImportFailed), Pre) => Decision::Admit(PreImportInProgress),
		(Some(ImportFailed), Final) => Decision::Reject(Error::pre_import_required()),

		(Some(ImportComplete), _) | (Some(Native), _) => Decision::ShortCircuit,
	}
}

/// Everything a background import needs beyond its inputs, bundled so it
/// can be moved into a detached `tokio::spawn`ed task.
#[derive(Clone)]
pub struct ImportStateMachine {
	namespaces: Arc<dyn NamespaceStore>,
	repositories: Arc<dyn RepositoryStore>,
	old_side: Arc<dyn StorageDriver>,
	gate: Arc<ConcurrencyGate>,
	importer: Arc<Importer>,
	notifier: Arc<ImportNotifier>,
	pre_import_timeout: Duration,
	import_timeout: Duration,
}

impl ImportStateMachine {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		namespaces: Arc<dyn NamespaceStore>,
		repositories: Arc<dyn RepositoryStore>,
		old_side: Arc<dyn StorageDriver>,
		gate: Arc<ConcurrencyGate>,
		importer: Arc<Importer>,
		notifier: Arc<ImportNotifier>,
		pre_import_timeout: Duration,
		import_timeout: Duration,
	) -> Self {
		Self {
			namespaces,
			repositories,
			old_side,
			gate,
			importer,
			notifier,
			pre_import_timeout,
			import_timeout,
		}
	}

	/// Admits or rejects a `pre`/`final` import request for `repo_path`,
	/// launching the background worker on admission. Parsing an unknown
	/// `import_type` string happens before this is called (at the HTTP or
	/// CLI boundary) precisely so it never touches the gate.
	pub async fn start(&self, repo_path: RepositoryPath, import_type: ImportType) -> Result<StartOutcome> {
		let Some(slot) = self.gate.try_acquire() else {
			return Err(Error::import_rate_limited());
		};

		let existing = self.repositories.find_by_path(&repo_path).await?;
		if existing.is_none() && !self.exists_on_old_side(&repo_path).await? {
			return Err(Error::name_unknown(repo_path.as_str()));
		}

		let current_status = existing.as_ref().map(|r| r.migration_status);
		match decide(current_status, import_type) {
			Decision::Reject(err) => Err(err),
			Decision::ShortCircuit => Ok(StartOutcome {
				admitted: false,
				repository: existing.expect("short-circuit only reached with an existing row"),
			}),
			Decision::Admit(next_status) => {
				let namespace = self.namespaces.get_or_create(repo_path.namespace_segment()).await?;
				let repository = match existing {
					Some(mut repository) => {
						repository.transition(next_status, None);
						self.repositories.upsert(repository).await?
					}
					None => {
						self.repositories
							.upsert(Repository::new(repo_path.clone(), namespace.id, next_status))
							.await?
					}
				};

				self.spawn_worker(repository.clone(), import_type, slot);
				Ok(StartOutcome { admitted: true, repository })
			}
		}
	}

	/// `GET …/import`. `Ok(None)` maps to 404 at the transport layer.
	pub async fn status(&self, repo_path: &RepositoryPath) -> Result<Option<Repository>> {
		self.repositories.find_by_path(repo_path).await
	}

	async fn exists_on_old_side(&self, repo_path: &RepositoryPath) -> Result<bool> {
		let prefix = format!("repositories/{repo_path}/");
		let entries = self.old_side.list(&prefix).await.map_err(Error::from)?;
		Ok(!entries.is_empty())
	}

	fn spawn_worker(&self, repository: Repository, import_type: ImportType, slot: crate::concurrency_gate::GateSlot) {
		let repositories = Arc::clone(&self.repositories);
		let importer = Arc::clone(&self.importer);
		let notifier = Arc::clone(&self.notifier);
		let deadline = match import_type {
			ImportType::Pre => self.pre_import_timeout,
			ImportType::Final => self.import_timeout,
		};

		tokio::spawn(async move {
			let _slot = slot;
			let span = tracing::info_span!("import_worker", repo_path = repository.path.as_str(), ?import_type);
			let _enter = span.enter();

			let run = async {
				match import_type {
					ImportType::Pre => importer.pre_import(repository.id, repository.path.as_str()).await,
					ImportType::Final => importer.import(repository.id, repository.path.as_str()).await,
				}
			};

			let result = match tokio::time::timeout(deadline, run).await {
				Ok(result) => result,
				Err(_) => Err(Error::DeadlineExceeded),
			};

			let (terminal_status, detail) = match (import_type, &result) {
				(ImportType::Pre, Ok(())) => (MigrationStatus::PreImportComplete, "pre import completed successfully".to_string()),
				(ImportType::Final, Ok(())) => (MigrationStatus::ImportComplete, "final import completed successfully".to_string()),
				(ImportType::Pre, Err(err)) => (MigrationStatus::PreImportFailed, err.detail()),
				(ImportType::Final, Err(err)) => (MigrationStatus::ImportFailed, err.detail()),
			};

			if let Err(err) = &result {
				tracing::error!(repo_path = repository.path.as_str(), ?import_type, error = %err, "import worker failed");
			}

			let mut updated = repository.clone();
			let persisted_error = if result.is_ok() { None } else { Some(detail.clone()) };
			updated.transition(terminal_status, persisted_error);
			if let Err(err) = repositories.upsert(updated).await {
				tracing::error!(repo_path = repository.path.as_str(), error = %err, "failed to persist terminal import status");
			}

			notifier.notify(repository.name(), repository.path.as_str(), terminal_status, &detail).await;
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn absent_pre_admits_and_absent_final_requires_pre() {
		assert!(matches!(decide(None, ImportType::Pre), Decision::Admit(MigrationStatus::PreImportInProgress)));
		assert!(matches!(decide(None, ImportType::Final), Decision::Reject(_)));
	}

	#[test]
	fn pre_in_progress_rejects_both() {
		assert!(matches!(decide(Some(MigrationStatus::PreImportInProgress), ImportType::Pre), Decision::Reject(_)));
		assert!(matches!(decide(Some(MigrationStatus::PreImportInProgress), ImportType::Final), Decision::Reject(_)));
	}

	#[test]
	fn pre_complete_admits_re_pre_and_final() {
		assert!(matches!(
			decide(Some(MigrationStatus::PreImportComplete), ImportType::Pre),
			Decision::Admit(MigrationStatus::PreImportInProgress)
		));
		assert!(matches!(
			decide(Some(MigrationStatus::PreImportComplete), ImportType::Final),
			Decision::Admit(MigrationStatus::ImportInProgress)
		));
	}

	#[test]
	fn pre_failed_admits_retry_pre_but_rejects_final() {
		assert!(matches!(
			decide(Some(MigrationStatus::PreImportFailed), ImportType::Pre),
			Decision::Admit(MigrationStatus::PreImportInProgress)
		));
		assert!(matches!(decide(Some(MigrationStatus::PreImportFailed), ImportType::Final), Decision::Reject(_)));
	}

	#[test]
	fn import_in_progress_rejects_both() {
		assert!(matches!(decide(Some(MigrationStatus::ImportInProgress), ImportType::Pre), Decision::Reject(_)));
		assert!(matches!(decide(Some(MigrationStatus::ImportInProgress), ImportType::Final), Decision::Reject(_)));
	}

	#[test]
	fn import_failed_admits_pre_but_final_requires_a_new_pre() {
		assert!(matches!(
			decide(Some(MigrationStatus::ImportFailed), ImportType::Pre),
			Decision::Admit(MigrationStatus::PreImportInProgress)
		));
		assert!(matches!(decide(Some(MigrationStatus::ImportFailed), ImportType::Final), Decision::Reject(_)));
	}

	#[test]
	fn terminal_states_short_circuit_both_import_types() {
		for status in [MigrationStatus::ImportComplete, MigrationStatus::Native] {
			assert!(matches!(decide(Some(status), ImportType::Pre), Decision::ShortCircuit));
			assert!(matches!(decide(Some(status), ImportType::Final), Decision::ShortCircuit));
		}
	}
}
