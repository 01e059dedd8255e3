//! Shared fixture builder for the end-to-end scenarios in `scenarios.rs`
//! and `properties.rs`: wires an [`AppState`] entirely out of in-memory
//! stores and drivers, and gives tests direct handles for seeding the old
//! side the way a real GitLab Rails monolith's storage layout would.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use registry_core::{tag_current_link_key, Digest, NoopMetricsSink, StorageDriver};
use registry_db::memory::{
	InMemoryBlobStore, InMemoryLeaseStore, InMemoryManifestStore, InMemoryNamespaceStore,
	InMemoryRepositoryStore, InMemoryTagStore,
};
use registry_http::{AppState, HealthCheck, Request, Response};
use registry_migrate::{ConcurrencyGate, ImportNotifier, ImportStateMachine, Importer, RenameCoordinator};
use registry_storage::InMemoryStorageDriver;
use serde::Serialize;
use wiremock::MockServer;

/// Always reports healthy; the scenarios here aren't exercising `/health`
/// failure modes, which are already covered at the unit level in
/// `registry-server`.
struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
	async fn check(&self) -> bool {
		true
	}
}

pub struct TestEnvironmentBuilder {
	capacity: u32,
	tag_concurrency: u32,
	pre_import_timeout: Duration,
	import_timeout: Duration,
	test_slow_import: Option<Duration>,
	rename_timeout: Duration,
}

impl Default for TestEnvironmentBuilder {
	fn default() -> Self {
		Self {
			capacity: 10,
			tag_concurrency: 4,
			pre_import_timeout: Duration::from_secs(5),
			import_timeout: Duration::from_secs(5),
			test_slow_import: None,
			rename_timeout: Duration::from_secs(30),
		}
	}
}

impl TestEnvironmentBuilder {
	pub fn capacity(mut self, capacity: u32) -> Self {
		self.capacity = capacity;
		self
	}

	pub fn slow_import(mut self, delay: Duration) -> Self {
		self.test_slow_import = Some(delay);
		self
	}

	pub fn pre_import_timeout(mut self, timeout: Duration) -> Self {
		self.pre_import_timeout = timeout;
		self
	}

	pub fn import_timeout(mut self, timeout: Duration) -> Self {
		self.import_timeout = timeout;
		self
	}

	pub async fn build(self) -> TestEnvironment {
		let old_side = Arc::new(InMemoryStorageDriver::new());
		let new_side: Arc<dyn StorageDriver> = Arc::new(InMemoryStorageDriver::new());

		let namespaces = Arc::new(InMemoryNamespaceStore::new());
		let repositories = Arc::new(InMemoryRepositoryStore::new());
		let blobs = Arc::new(InMemoryBlobStore::new());
		let manifests = Arc::new(InMemoryManifestStore::new());
		let tags = Arc::new(InMemoryTagStore::new());
		let leases = Arc::new(InMemoryLeaseStore::new());

		let notify_server = MockServer::start().await;
		let notify_url = Some(format!("{}/hooks/import", notify_server.uri()));

		let metrics = Arc::new(NoopMetricsSink);
		let gate = Arc::new(ConcurrencyGate::new(self.capacity, metrics));
		let importer = Arc::new(Importer::new(
			Arc::clone(&old_side) as Arc<dyn StorageDriver>,
			Arc::clone(&new_side),
			Arc::clone(&blobs) as Arc<dyn registry_core::BlobStore>,
			Arc::clone(&manifests) as Arc<dyn registry_core::ManifestStore>,
			Arc::clone(&tags) as Arc<dyn registry_core::TagStore>,
			self.tag_concurrency,
			self.test_slow_import,
		));
		let notifier = Arc::new(ImportNotifier::new(notify_url, Duration::from_secs(5)));

		let state_machine = Arc::new(ImportStateMachine::new(
			Arc::clone(&namespaces) as Arc<dyn registry_core::NamespaceStore>,
			Arc::clone(&repositories) as Arc<dyn registry_core::RepositoryStore>,
			Arc::clone(&old_side) as Arc<dyn StorageDriver>,
			Arc::clone(&gate),
			Arc::clone(&importer),
			Arc::clone(&notifier),
			self.pre_import_timeout,
			self.import_timeout,
		));

		let rename_coordinator = Arc::new(RenameCoordinator::new(
			Arc::clone(&repositories) as Arc<dyn registry_core::RepositoryStore>,
			Some(Arc::clone(&leases) as Arc<dyn registry_core::LeaseStore>),
			self.rename_timeout,
		));

		let app_state = Arc::new(AppState {
			repositories: Arc::clone(&repositories) as Arc<dyn registry_core::RepositoryStore>,
			tags: Arc::clone(&tags) as Arc<dyn registry_core::TagStore>,
			blobs: Arc::clone(&blobs) as Arc<dyn registry_core::BlobStore>,
			state_machine,
			rename_coordinator,
			health: Arc::new(AlwaysHealthy),
		});

		TestEnvironment {
			old_side,
			repositories,
			tags,
			blobs,
			manifests,
			leases,
			notify_server,
			app_state,
		}
	}
}

/// A fully wired control plane backed entirely by in-memory stores, plus
/// direct handles onto the old-side driver and the concrete stores so
/// scenarios can seed fixtures and assert on persisted rows without going
/// through HTTP.
pub struct TestEnvironment {
	pub old_side: Arc<InMemoryStorageDriver>,
	pub repositories: Arc<InMemoryRepositoryStore>,
	pub tags: Arc<InMemoryTagStore>,
	pub blobs: Arc<InMemoryBlobStore>,
	pub manifests: Arc<InMemoryManifestStore>,
	pub leases: Arc<InMemoryLeaseStore>,
	pub notify_server: MockServer,
	pub app_state: Arc<AppState>,
}

impl TestEnvironment {
	pub fn builder() -> TestEnvironmentBuilder {
		TestEnvironmentBuilder::default()
	}

	pub async fn new() -> Self {
		Self::builder().build().await
	}

	/// Writes a content-addressed blob to the old side and returns its digest.
	pub async fn write_blob(&self, bytes: &[u8]) -> Digest {
		let digest = Digest::from_bytes(bytes);
		self.old_side.write(&registry_core::blob_key(&digest), bytes.to_vec()).await.unwrap();
		digest
	}

	/// Writes a manifest revision plus its `_manifests/revisions/.../link`
	/// marker, mirroring the old side's on-disk layout.
	pub async fn write_manifest_revision(&self, repo_path: &str, digest: &Digest, bytes: Vec<u8>) {
		self.old_side.write(&registry_core::manifest_key(digest), bytes).await.unwrap();
		self.old_side
			.write(
				&format!("repositories/{repo_path}/_manifests/revisions/sha256/{}/link", digest.hex()),
				Vec::new(),
			)
			.await
			.unwrap();
	}

	/// Writes a `tags/<name>/current/link` pointer at `digest`.
	pub async fn write_tag_link(&self, repo_path: &str, tag_name: &str, digest: &Digest) {
		self.old_side
			.write(&tag_current_link_key(repo_path, tag_name), digest.as_str().as_bytes().to_vec())
			.await
			.unwrap();
	}

	/// Seeds a minimal single-layer Docker v2 image under `repo_path`,
	/// tagged `tag_name`, and returns the manifest digest. The shape mirrors
	/// what a real push leaves behind: a config blob, one layer blob, a
	/// manifest revision, and a current tag link.
	pub async fn push_image(&self, repo_path: &str, tag_name: &str) -> Digest {
		let config_digest = self.write_blob(b"{}").await;
		let layer_digest = self.write_blob(b"layer bytes").await;
		let manifest_bytes = serde_json::json!({
			"mediaType": "application/vnd.docker.distribution.manifest.v2+json",
			"config": {"digest": config_digest.as_str(), "size": 2},
			"layers": [{"digest": layer_digest.as_str(), "size": 11}],
		})
		.to_string()
		.into_bytes();
		let manifest_digest = Digest::from_bytes(&manifest_bytes);
		self.write_manifest_revision(repo_path, &manifest_digest, manifest_bytes).await;
		self.write_tag_link(repo_path, tag_name, &manifest_digest).await;
		manifest_digest
	}

	/// Dispatches a bodyless request through the same router the server
	/// binds to hyper with.
	pub async fn request(&self, method: Method, uri: &str) -> Response {
		let req = Request::builder().method(method).uri(uri).body(Bytes::new()).build().unwrap();
		registry_http::dispatch(&self.app_state, req).await
	}

	pub async fn get(&self, uri: &str) -> Response {
		self.request(Method::GET, uri).await
	}

	pub async fn put(&self, uri: &str) -> Response {
		self.request(Method::PUT, uri).await
	}

	pub async fn patch_json(&self, uri: &str, body: &impl Serialize) -> Response {
		let bytes = Bytes::from(serde_json::to_vec(body).unwrap());
		let req = Request::builder().method(Method::PATCH).uri(uri).body(bytes).build().unwrap();
		registry_http::dispatch(&self.app_state, req).await
	}

	/// Polls `GET …/import` until the repository reaches a terminal status
	/// or `timeout` elapses, returning the last observed body as JSON.
	pub async fn wait_for_terminal_status(&self, status_uri: &str, timeout: Duration) -> HashMap<String, serde_json::Value> {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			let response = self.get(status_uri).await;
			if response.status == 200 {
				let body: HashMap<String, serde_json::Value> = serde_json::from_slice(&response.body).unwrap();
				let status = body.get("status").and_then(|v| v.as_str()).unwrap_or_default();
				if matches!(status, "pre_import_complete" | "pre_import_failed" | "import_complete" | "import_failed" | "native") {
					return body;
				}
			}
			if tokio::time::Instant::now() >= deadline {
				panic!("import did not reach a terminal status within {timeout:?}");
			}
			tokio::time::sleep(Duration::from_millis(20)).await;
		}
	}
}

pub fn body_json(response: &Response) -> serde_json::Value {
	serde_json::from_slice(&response.body).unwrap()
}
