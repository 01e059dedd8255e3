//! Property-style coverage for invariants that cut across the whole stack
//! rather than belonging to one module's unit tests: gate admission exactly
//! matching configured capacity, migration-path routing agreeing with
//! status for every state, and the rename subtree size limit, all driven
//! through the HTTP dispatch layer the way a real client would observe them.

mod support;

use rstest::rstest;
use support::TestEnvironment;

use registry_core::{MigrationStatus, Repository, RepositoryPath};
use serde_json::json;

/// Property: a gate of capacity `n` admits exactly `n` of `2n` simultaneous
/// import requests, regardless of `n`.
#[rstest]
#[case(1)]
#[case(3)]
#[case(7)]
#[tokio::test]
async fn gate_admits_exactly_its_capacity(#[case] capacity: u32) {
	let env = TestEnvironment::builder()
		.capacity(capacity)
		.slow_import(std::time::Duration::from_millis(200))
		.build()
		.await;

	let total = capacity * 2;
	for n in 0..total {
		env.push_image(&format!("group/prop{n}"), "latest").await;
	}

	let mut admitted = 0;
	for n in 0..total {
		let response = env.put(&format!("/gitlab/v1/repositories/group/prop{n}/import?import_type=pre")).await;
		if response.status == 202 {
			admitted += 1;
		} else {
			assert_eq!(response.status, 429);
		}
	}

	assert_eq!(admitted, capacity);
}

/// Property: `GET` on a repository in every migration status stamps
/// `Gitlab-Migration-Path` exactly as `select_route` dictates — `new` for
/// `native`/`import_complete`, `old` for every other state.
#[rstest]
#[case(MigrationStatus::Native, "new")]
#[case(MigrationStatus::ImportComplete, "new")]
#[case(MigrationStatus::ImportInProgress, "old")]
#[case(MigrationStatus::ImportFailed, "old")]
#[case(MigrationStatus::PreImportInProgress, "old")]
#[case(MigrationStatus::PreImportComplete, "old")]
#[case(MigrationStatus::PreImportFailed, "old")]
#[tokio::test]
async fn migration_path_header_matches_route_selection_for_every_status(#[case] status: MigrationStatus, #[case] expected: &str) {
	let env = TestEnvironment::new().await;
	let path = RepositoryPath::parse("group/routed").unwrap();
	env.repositories.upsert(Repository::new(path, uuid::Uuid::new_v4(), status)).await.unwrap();

	let response = env.get("/gitlab/v1/repositories/group/routed").await;
	assert_eq!(response.status, 200);
	assert_eq!(response.headers.get("gitlab-migration-path").unwrap(), expected);
}

/// Property: a rename whose subtree exceeds the 1000-repository limit is
/// rejected outright and never touches a single row.
#[tokio::test]
async fn rename_rejects_oversized_subtrees_without_mutating_anything() {
	let env = TestEnvironment::new().await;
	let namespace = uuid::Uuid::new_v4();
	env.repositories
		.upsert(Repository::new(RepositoryPath::parse("big/base").unwrap(), namespace, MigrationStatus::Native))
		.await
		.unwrap();
	for n in 0..1001 {
		env.repositories
			.upsert(Repository::new(RepositoryPath::parse(&format!("big/base/child{n}")).unwrap(), namespace, MigrationStatus::Native))
			.await
			.unwrap();
	}

	let response = env.patch_json("/gitlab/v1/repositories/big/base?dry_run=true", &json!({"name": "renamed"})).await;
	assert_eq!(response.status, 400);
	assert!(String::from_utf8_lossy(&response.body).contains("EXCEEDS_LIMIT"));

	assert!(env.repositories.find_by_path(&RepositoryPath::parse("big/base").unwrap()).await.unwrap().is_some());
	assert!(env.repositories.find_by_path(&RepositoryPath::parse("big/renamed").unwrap()).await.unwrap().is_none());
}
