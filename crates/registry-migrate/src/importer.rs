//! The repository-scoped worker: walks the old side's manifest and tag
//! layout and populates the new-side database and storage.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use registry_core::{
	manifest_revisions_prefix, tag_current_link_key, tags_prefix, Blob, BlobLink, BlobStore, Digest,
	Error, Manifest, ManifestReference, ManifestStore, MediaType, ReferenceKind, ResultExt, Result,
	StorageDriver, Tag, TagStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::blob_transfer::BlobTransferService;

/// The stores and storage drivers a repository-scoped import needs.
/// Constructed once per process and shared across concurrent imports via
/// `Arc`.
pub struct Importer {
	old_side: Arc<dyn StorageDriver>,
	new_side: Arc<dyn StorageDriver>,
	blobs: Arc<dyn BlobStore>,
	manifests: Arc<dyn ManifestStore>,
	tags: Arc<dyn TagStore>,
	transfer: BlobTransferService,
	tag_concurrency: u32,
	/// Test-only artificial delay injected before each manifest is
	/// processed, to let tests observe an in-progress import.
	test_slow_import: Option<Duration>,
}

impl Importer {
	pub fn new(
		old_side: Arc<dyn StorageDriver>,
		new_side: Arc<dyn StorageDriver>,
		blobs: Arc<dyn BlobStore>,
		manifests: Arc<dyn ManifestStore>,
		tags: Arc<dyn TagStore>,
		tag_concurrency: u32,
		test_slow_import: Option<Duration>,
	) -> Self {
		let transfer = BlobTransferService::new(Arc::clone(&old_side), Arc::clone(&new_side));
		Self {
			old_side,
			new_side,
			blobs,
			manifests,
			tags,
			transfer,
			tag_concurrency,
			test_slow_import,
		}
	}

	/// Imports every manifest and blob reachable from the old side, then
	/// confirms the repository has at least one resolvable tag — without
	/// writing any `Tag` row, leaving the repository un-routable to the new
	/// side. A tagless repository fails here rather than during
	/// [`Self::import`], so the cutover window is shrunk by the time a
	/// caller attempts a final import.
	pub async fn pre_import(&self, repository_id: Uuid, repo_path: &str) -> Result<()> {
		self.import_manifests(repository_id, repo_path).await.context("pre importing manifests")?;
		self.verify_tags(repo_path).await.context("pre importing tagged manifests")?;
		Ok(())
	}

	/// Imports manifests, blobs, and tags. Idempotent: re-running on a
	/// partially (or fully) imported repository creates no duplicate rows.
	pub async fn import(&self, repository_id: Uuid, repo_path: &str) -> Result<()> {
		self.import_manifests(repository_id, repo_path).await.context("importing manifests")?;
		self.import_tags(repository_id, repo_path).await.context("importing tagged manifests")?;
		Ok(())
	}

	async fn import_manifests(&self, repository_id: Uuid, repo_path: &str) -> Result<()> {
		let prefix = manifest_revisions_prefix(repo_path);
		let entries = self.old_side.list(&prefix).await.map_err(Error::from).context("listing manifest revisions")?;

		let mut seen = HashSet::new();
		for entry in entries {
			let Some(digest) = digest_from_revision_key(&entry.path) else {
				continue;
			};
			Box::pin(self.import_manifest_tree(repository_id, &digest, &mut seen)).await?;
		}
		Ok(())
	}

	/// Depth-first import of one manifest and everything it references,
	/// breaking cycles via `seen`.
	async fn import_manifest_tree(
		&self,
		repository_id: Uuid,
		digest: &Digest,
		seen: &mut HashSet<Digest>,
	) -> Result<()> {
		if !seen.insert(digest.clone()) {
			return Ok(());
		}

		if let Some(delay) = self.test_slow_import {
			tokio::time::sleep(delay).await;
		}

		if self.manifests.find_by_digest(repository_id, digest).await?.is_some() {
			return Ok(());
		}

		let bytes = self
			.old_side
			.read(&registry_core::manifest_key(digest))
			.await
			.map_err(Error::from)
			.context(format!("reading manifest {digest}"))?;

		let computed = Digest::from_bytes(&bytes);
		if &computed != digest {
			return Err(Error::Internal(format!(
				"manifest content does not match its declared digest: declared={digest}, computed={computed}"
			)));
		}

		let parsed: RawManifest = serde_json::from_slice(&bytes)
			.map_err(|e| Error::Internal(format!("parsing manifest {digest}: {e}")))?;
		let media_type = parsed.media_type()?;

		self.transfer
			.ensure_bytes_present(&registry_core::manifest_key(digest), &bytes)
			.await
			.map_err(Error::from)?;

		let manifest = self
			.manifests
			.upsert(Manifest::new(repository_id, digest.clone(), media_type, bytes.len() as u64))
			.await?;

		if media_type.is_index() {
			for child in parsed.manifests.unwrap_or_default() {
				let child_digest: Digest = child
					.digest
					.parse()
					.map_err(|e: registry_core::digest::DigestParseError| Error::Internal(e.to_string()))?;
				Box::pin(self.import_manifest_tree(repository_id, &child_digest, seen)).await?;
				self.manifests
					.add_reference(ManifestReference {
						parent_manifest_id: manifest.id,
						child_digest,
						kind: ReferenceKind::Manifest,
					})
					.await?;
			}
			return Ok(());
		}

		let mut descriptors = parsed.layers.unwrap_or_default();
		if let Some(config) = parsed.config {
			descriptors.push(config);
		}
		for descriptor in descriptors {
			let blob_digest: Digest = descriptor
				.digest
				.parse()
				.map_err(|e: registry_core::digest::DigestParseError| Error::Internal(e.to_string()))?;
			self.transfer.ensure_present(&blob_digest).await.map_err(Error::from).context(format!("transferring blob {blob_digest}"))?;
			self.blobs.upsert(Blob::new(blob_digest.clone(), descriptor.size)).await?;
			self.blobs
				.link(BlobLink { repository_id, digest: blob_digest.clone() })
				.await?;
			self.manifests
				.add_reference(ManifestReference {
					parent_manifest_id: manifest.id,
					child_digest: blob_digest,
					kind: ReferenceKind::Blob,
				})
				.await?;
		}

		Ok(())
	}

	/// Lists the tags reachable from the old side and errors if there are
	/// none, but never writes a `Tag` row. Used by [`Self::pre_import`] to
	/// surface a tagless repository early.
	async fn verify_tags(&self, repo_path: &str) -> Result<()> {
		self.list_tag_names(repo_path).await.context("reading tags").map(|_| ())
	}

	async fn import_tags(&self, repository_id: Uuid, repo_path: &str) -> Result<()> {
		self.resolve_tags(repository_id, repo_path).await.context("reading tags")
	}

	async fn list_tag_names(&self, repo_path: &str) -> Result<Vec<String>> {
		let prefix = tags_prefix(repo_path);
		let entries = self.old_side.list(&prefix).await.map_err(Error::from)?;

		let tag_names: Vec<String> = entries
			.iter()
			.filter_map(|entry| tag_name_from_current_link_key(&entry.path, repo_path))
			.collect();

		if tag_names.is_empty() {
			return Err(Error::name_unknown(repo_path));
		}
		Ok(tag_names)
	}

	async fn resolve_tags(&self, repository_id: Uuid, repo_path: &str) -> Result<()> {
		let tag_names = self.list_tag_names(repo_path).await?;

		if self.tag_concurrency == 0 {
			// Reserved for tests observing an import stuck mid-flight: never
			// admits a single tag, so the worker sits here until its deadline.
			std::future::pending::<()>().await;
		}

		let concurrency = self.tag_concurrency as usize;
		let mut in_flight = FuturesUnordered::new();
		let mut remaining = tag_names.into_iter();

		for name in remaining.by_ref().take(concurrency) {
			in_flight.push(self.import_one_tag(repository_id, repo_path, name));
		}
		while let Some(result) = in_flight.next().await {
			result?;
			if let Some(name) = remaining.next() {
				in_flight.push(self.import_one_tag(repository_id, repo_path, name));
			}
		}
		Ok(())
	}

	async fn import_one_tag(&self, repository_id: Uuid, repo_path: &str, name: String) -> Result<()> {
		let link_key = tag_current_link_key(repo_path, &name);
		let raw = self
			.old_side
			.read(&link_key)
			.await
			.map_err(Error::from)
			.context(format!("resolving tag {name}"))?;
		let digest: Digest = String::from_utf8_lossy(&raw)
			.trim()
			.parse()
			.map_err(|e: registry_core::digest::DigestParseError| Error::Internal(e.to_string()))?;

		self.tags.upsert(Tag::new(repository_id, name, digest)).await?;
		Ok(())
	}
}

fn digest_from_revision_key(key: &str) -> Option<Digest> {
	let hex = key.rsplit('/').nth(1)?;
	format!("{}:{hex}", Digest::ALGORITHM).parse().ok()
}

fn tag_name_from_current_link_key(key: &str, repo_path: &str) -> Option<String> {
	let prefix = tags_prefix(repo_path);
	let suffix = key.strip_prefix(&prefix)?;
	suffix.strip_suffix("/current/link").map(str::to_string)
}

#[derive(Debug, Deserialize, Default)]
struct Descriptor {
	digest: String,
	size: u64,
}

#[derive(Debug, Deserialize, Default)]
struct RawManifest {
	#[serde(rename = "mediaType")]
	media_type_field: Option<String>,
	config: Option<Descriptor>,
	layers: Option<Vec<Descriptor>>,
	manifests: Option<Vec<Descriptor>>,
}

impl RawManifest {
	fn media_type(&self) -> Result<MediaType> {
		let raw = self
			.media_type_field
			.as_deref()
			.ok_or_else(|| Error::Internal("manifest is missing its mediaType field".to_string()))?;
		match raw {
			"application/vnd.docker.distribution.manifest.v2+json" => Ok(MediaType::DockerManifestV2),
			"application/vnd.docker.distribution.manifest.list.v2+json" => Ok(MediaType::DockerManifestList),
			"application/vnd.oci.image.manifest.v1+json" => Ok(MediaType::OciImageManifest),
			"application/vnd.oci.image.index.v1+json" => Ok(MediaType::OciImageIndex),
			other => Err(Error::Internal(format!("unrecognized manifest media type: {other:?}"))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use registry_db::memory::{InMemoryBlobStore, InMemoryManifestStore, InMemoryTagStore};
	use registry_storage::InMemoryStorageDriver;

	async fn write_blob(old: &InMemoryStorageDriver, bytes: &[u8]) -> Digest {
		let digest = Digest::from_bytes(bytes);
		old.write(&registry_core::blob_key(&digest), bytes.to_vec()).await.unwrap();
		digest
	}

	async fn write_manifest_revision(old: &InMemoryStorageDriver, repo_path: &str, digest: &Digest, bytes: Vec<u8>) {
		old.write(&registry_core::manifest_key(digest), bytes).await.unwrap();
		old.write(
			&format!("repositories/{repo_path}/_manifests/revisions/sha256/{}/link", digest.hex()),
			b"".to_vec(),
		)
		.await
		.unwrap();
	}

	fn make_importer(old: Arc<InMemoryStorageDriver>) -> (Importer, Arc<InMemoryManifestStore>, Arc<InMemoryTagStore>) {
		let new_side: Arc<dyn StorageDriver> = Arc::new(InMemoryStorageDriver::new());
		let blobs = Arc::new(InMemoryBlobStore::new());
		let manifests = Arc::new(InMemoryManifestStore::new());
		let tags = Arc::new(InMemoryTagStore::new());
		let importer = Importer::new(old, new_side, blobs, Arc::clone(&manifests), Arc::clone(&tags), 4, None);
		(importer, manifests, tags)
	}

	#[tokio::test]
	async fn pre_import_of_a_tagless_repository_fails_with_the_canonical_message() {
		let old = Arc::new(InMemoryStorageDriver::new());
		let config_digest = write_blob(&old, b"{}").await;
		let layer_digest = write_blob(&old, b"layer bytes").await;
		let manifest_bytes = serde_json::json!({
			"mediaType": "application/vnd.docker.distribution.manifest.v2+json",
			"config": {"digest": config_digest.as_str(), "size": 2},
			"layers": [{"digest": layer_digest.as_str(), "size": 11}],
		})
		.to_string()
		.into_bytes();
		let manifest_digest = Digest::from_bytes(&manifest_bytes);
		write_manifest_revision(&old, "notags/repo", &manifest_digest, manifest_bytes).await;

		let (importer, manifests, tags) = make_importer(old);
		let repository_id = Uuid::new_v4();
		let err = importer.pre_import(repository_id, "notags/repo").await.unwrap_err();
		assert!(
			err.detail().contains("pre importing tagged manifests: reading tags: unknown repository name=notags/repo"),
			"unexpected detail: {}",
			err.detail()
		);

		// The manifest walk runs before tag verification, so it is already
		// imported even though the overall pre-import failed.
		assert!(manifests.find_by_digest(repository_id, &manifest_digest).await.unwrap().is_some());
		assert!(tags.find(repository_id, "latest").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn final_import_of_a_tagless_repository_fails_with_the_canonical_message() {
		let old = Arc::new(InMemoryStorageDriver::new());
		let (importer, _manifests, _tags) = make_importer(old);
		let repository_id = Uuid::new_v4();

		let err = importer.import(repository_id, "notags/repo").await.unwrap_err();
		assert!(
			err.detail().contains("importing tagged manifests: reading tags: unknown repository name=notags/repo"),
			"unexpected detail: {}",
			err.detail()
		);
	}

	#[tokio::test]
	async fn final_import_resolves_tags_to_manifest_digests() {
		let old = Arc::new(InMemoryStorageDriver::new());
		let config_digest = write_blob(&old, b"{}").await;
		let manifest_bytes = serde_json::json!({
			"mediaType": "application/vnd.docker.distribution.manifest.v2+json",
			"config": {"digest": config_digest.as_str(), "size": 2},
			"layers": [],
		})
		.to_string()
		.into_bytes();
		let manifest_digest = Digest::from_bytes(&manifest_bytes);
		write_manifest_revision(&old, "tagged/repo", &manifest_digest, manifest_bytes).await;
		old.write(&tag_current_link_key("tagged/repo", "import-tag"), manifest_digest.as_str().into_bytes())
			.await
			.unwrap();

		let (importer, _manifests, tags) = make_importer(old);
		let repository_id = Uuid::new_v4();
		importer.import(repository_id, "tagged/repo").await.unwrap();

		let tag = tags.find(repository_id, "import-tag").await.unwrap().unwrap();
		assert_eq!(tag.manifest_digest, manifest_digest);
	}

	#[tokio::test(start_paused = true)]
	async fn tag_concurrency_zero_blocks_the_worker_indefinitely() {
		let old = Arc::new(InMemoryStorageDriver::new());
		let config_digest = write_blob(&old, b"{}").await;
		let manifest_bytes = serde_json::json!({
			"mediaType": "application/vnd.docker.distribution.manifest.v2+json",
			"config": {"digest": config_digest.as_str(), "size": 2},
			"layers": [],
		})
		.to_string()
		.into_bytes();
		let manifest_digest = Digest::from_bytes(&manifest_bytes);
		write_manifest_revision(&old, "blocked/repo", &manifest_digest, manifest_bytes).await;
		old.write(&tag_current_link_key("blocked/repo", "latest"), manifest_digest.as_str().into_bytes())
			.await
			.unwrap();

		let new_side: Arc<dyn StorageDriver> = Arc::new(InMemoryStorageDriver::new());
		let blobs = Arc::new(InMemoryBlobStore::new());
		let manifests = Arc::new(InMemoryManifestStore::new());
		let tags = Arc::new(InMemoryTagStore::new());
		let importer = Importer::new(old, new_side, blobs, manifests, Arc::clone(&tags), 0, None);
		let repository_id = Uuid::new_v4();

		let outcome = tokio::time::timeout(Duration::from_secs(3600), importer.import(repository_id, "blocked/repo")).await;
		assert!(outcome.is_err(), "import with tag_concurrency=0 must never complete on its own");
		assert!(tags.find(repository_id, "latest").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn re_running_an_import_does_not_duplicate_rows() {
		let old = Arc::new(InMemoryStorageDriver::new());
		let config_digest = write_blob(&old, b"{}").await;
		let manifest_bytes = serde_json::json!({
			"mediaType": "application/vnd.docker.distribution.manifest.v2+json",
			"config": {"digest": config_digest.as_str(), "size": 2},
			"layers": [],
		})
		.to_string()
		.into_bytes();
		let manifest_digest = Digest::from_bytes(&manifest_bytes);
		write_manifest_revision(&old, "idem/repo", &manifest_digest, manifest_bytes).await;
		old.write(&tag_current_link_key("idem/repo", "latest"), manifest_digest.as_str().into_bytes())
			.await
			.unwrap();

		let (importer, manifests, _tags) = make_importer(old);
		let repository_id = Uuid::new_v4();
		importer.import(repository_id, "idem/repo").await.unwrap();
		importer.import(repository_id, "idem/repo").await.unwrap();

		assert!(manifests.find_by_digest(repository_id, &manifest_digest).await.unwrap().is_some());
	}
}
