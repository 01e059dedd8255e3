//! End-to-end scenarios exercising the router, state machine, importer,
//! and rename coordinator together through the same [`registry_http::dispatch`]
//! entry point `registry-server` hands every connection.

mod support;

use std::time::Duration;

use http::Method;
use serde_json::json;
use support::{body_json, TestEnvironment};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

/// S1: a freshly pushed repository goes through the required pre-import
/// before final import admits (a bare `final` on an absent row is
/// `PreImportRequired`, per the admission table), ends up routable to the
/// new side, and fires the completion webhook once per terminal status.
#[tokio::test]
async fn s1_happy_path_final_import() {
	let env = TestEnvironment::new().await;
	env.push_image("group/app", "latest").await;

	Mock::given(method("POST"))
		.and(path("/hooks/import"))
		.respond_with(ResponseTemplate::new(200))
		.expect(2)
		.mount(&env.notify_server)
		.await;

	let bare_final = env.put("/gitlab/v1/repositories/group/app/import?import_type=final").await;
	assert_eq!(bare_final.status, 424);
	assert!(String::from_utf8_lossy(&bare_final.body).contains("PRE_IMPORT_REQUIRED"));

	let pre = env.put("/gitlab/v1/repositories/group/app/import?import_type=pre").await;
	assert_eq!(pre.status, 202);
	assert_eq!(pre.headers.get("gitlab-migration-path").unwrap(), "old");

	let pre_body = env.wait_for_terminal_status("/gitlab/v1/repositories/group/app/import", Duration::from_secs(5)).await;
	assert_eq!(pre_body["status"], "pre_import_complete");

	let response = env.put("/gitlab/v1/repositories/group/app/import?import_type=final").await;
	assert_eq!(response.status, 202);
	assert_eq!(response.headers.get("gitlab-migration-path").unwrap(), "old");

	let body = env.wait_for_terminal_status("/gitlab/v1/repositories/group/app/import", Duration::from_secs(5)).await;
	assert_eq!(body["status"], "import_complete");

	let detail = env.get("/gitlab/v1/repositories/group/app").await;
	assert_eq!(detail.status, 200);
	assert_eq!(detail.headers.get("gitlab-migration-path").unwrap(), "new");
	let detail_body = body_json(&detail);
	assert_eq!(detail_body["status"], "import_complete");

	let repeat = env.put("/gitlab/v1/repositories/group/app/import?import_type=final").await;
	assert_eq!(repeat.status, 200);
}

/// S2: a pre import followed by a final import leaves tags resolved and
/// never double-counts blobs on the second pass.
#[tokio::test]
async fn s2_pre_then_final_import() {
	let env = TestEnvironment::new().await;
	env.push_image("group/staged", "v1").await;

	let pre = env.put("/gitlab/v1/repositories/group/staged/import?import_type=pre").await;
	assert_eq!(pre.status, 202);
	let pre_body = env.wait_for_terminal_status("/gitlab/v1/repositories/group/staged/import", Duration::from_secs(5)).await;
	assert_eq!(pre_body["status"], "pre_import_complete");

	let fin = env.put("/gitlab/v1/repositories/group/staged/import?import_type=final").await;
	assert_eq!(fin.status, 202);
	let fin_body = env.wait_for_terminal_status("/gitlab/v1/repositories/group/staged/import", Duration::from_secs(5)).await;
	assert_eq!(fin_body["status"], "import_complete");

	let tags = env.get("/gitlab/v1/repositories/group/staged/tags/list").await;
	assert_eq!(tags.status, 200);
	let tag_entries = body_json(&tags);
	assert_eq!(tag_entries.as_array().unwrap().len(), 1);
	assert_eq!(tag_entries[0]["name"], "v1");
}

/// S3: while a pre import is running, a second pre (or a final) on the same
/// repository is rejected with `425`/`424` rather than racing the worker.
#[tokio::test]
async fn s3_in_progress_pre_import_blocks_concurrent_requests() {
	let env = TestEnvironment::builder().slow_import(Duration::from_millis(300)).build().await;
	env.push_image("group/slow", "latest").await;

	let first = env.put("/gitlab/v1/repositories/group/slow/import?import_type=pre").await;
	assert_eq!(first.status, 202);

	let second_pre = env.put("/gitlab/v1/repositories/group/slow/import?import_type=pre").await;
	assert_eq!(second_pre.status, 425);
	assert!(String::from_utf8_lossy(&second_pre.body).contains("PRE_IMPORT_IN_PROGRESS"));

	let final_attempt = env.put("/gitlab/v1/repositories/group/slow/import?import_type=final").await;
	assert_eq!(final_attempt.status, 425);

	env.wait_for_terminal_status("/gitlab/v1/repositories/group/slow/import", Duration::from_secs(5)).await;
}

/// S4: a repository with manifests but no tags fails pre-import with the
/// canonical, context-chained detail string, and a subsequent final import
/// is rejected outright since no successful pre-import ever completed.
#[tokio::test]
async fn s4_tagless_repository_fails_pre_import_with_canonical_detail() {
	let env = TestEnvironment::new().await;
	let config_digest = env.write_blob(b"{}").await;
	let manifest_bytes = json!({
		"mediaType": "application/vnd.docker.distribution.manifest.v2+json",
		"config": {"digest": config_digest.as_str(), "size": 2},
		"layers": [],
	})
	.to_string()
	.into_bytes();
	let manifest_digest = registry_core::Digest::from_bytes(&manifest_bytes);
	env.write_manifest_revision("notags/repo", &manifest_digest, manifest_bytes).await;

	let start = env.put("/gitlab/v1/repositories/notags/repo/import?import_type=pre").await;
	assert_eq!(start.status, 202);

	let status = env.wait_for_terminal_status("/gitlab/v1/repositories/notags/repo/import", Duration::from_secs(5)).await;
	assert_eq!(status["status"], "pre_import_failed");
	assert_eq!(
		status["detail"],
		"pre importing tagged manifests: reading tags: unknown repository name=notags/repo"
	);

	let retry_final = env.put("/gitlab/v1/repositories/notags/repo/import?import_type=final").await;
	assert_eq!(retry_final.status, 424);
}

/// S5: with a concurrency cap of 3, exactly 3 of 5 simultaneous import
/// requests are admitted; the rest receive `429`.
#[tokio::test]
async fn s5_concurrency_cap_admits_exactly_capacity() {
	let env = TestEnvironment::builder().capacity(3).slow_import(Duration::from_millis(300)).build().await;
	for n in 0..5 {
		env.push_image(&format!("group/repo{n}"), "latest").await;
	}

	let mut admitted = 0;
	let mut rejected = 0;
	for n in 0..5 {
		let response = env.put(&format!("/gitlab/v1/repositories/group/repo{n}/import?import_type=pre")).await;
		match response.status {
			202 => admitted += 1,
			429 => rejected += 1,
			other => panic!("unexpected status {other}"),
		}
	}

	assert_eq!(admitted, 3);
	assert_eq!(rejected, 2);

	for n in 0..5 {
		let uri = format!("/gitlab/v1/repositories/group/repo{n}/import");
		if env.get(&uri).await.status == 200 {
			env.wait_for_terminal_status(&uri, Duration::from_secs(5)).await;
		}
	}
}

/// S6: renaming a repository onto a name already leased by another rename
/// in flight is a conflict, and the losing rename never mutates anything.
#[tokio::test]
async fn s6_rename_conflict_on_a_contested_target() {
	let env = TestEnvironment::new().await;
	env.repositories
		.upsert(registry_core::Repository::new(
			registry_core::RepositoryPath::parse("group/first").unwrap(),
			uuid::Uuid::new_v4(),
			registry_core::MigrationStatus::Native,
		))
		.await
		.unwrap();
	env.repositories
		.upsert(registry_core::Repository::new(
			registry_core::RepositoryPath::parse("group/second").unwrap(),
			uuid::Uuid::new_v4(),
			registry_core::MigrationStatus::Native,
		))
		.await
		.unwrap();

	let first_preview = env
		.patch_json("/gitlab/v1/repositories/group/first?dry_run=true", &json!({"name": "shared-target"}))
		.await;
	assert_eq!(first_preview.status, 200);

	let second_attempt = env
		.patch_json("/gitlab/v1/repositories/group/second?dry_run=true", &json!({"name": "shared-target"}))
		.await;
	assert_eq!(second_attempt.status, 409);
	assert!(String::from_utf8_lossy(&second_attempt.body).contains("RENAME_CONFLICT"));

	assert!(env.repositories.find_by_path(&registry_core::RepositoryPath::parse("group/second").unwrap()).await.unwrap().is_some());
	assert!(env.repositories.find_by_path(&registry_core::RepositoryPath::parse("group/shared-target").unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
	let env = TestEnvironment::new().await;
	let response = env.request(Method::GET, "/gitlab/v1/health").await;
	assert_eq!(response.status, 200);
}
