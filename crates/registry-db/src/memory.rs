//! In-memory fakes for every store trait, backing tests and the
//! `TestEnvironment` harness. Not recommended for production use.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use registry_core::{
	Blob, BlobLink, BlobStore, Digest, Error, LeaseStore, Manifest, ManifestReference, ManifestStore,
	Namespace, NamespaceStore, Page, PageRequest, Repository, RepositoryLease, RepositoryPath,
	RepositoryStore, Tag, TagStore,
};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct InMemoryNamespaceStore {
	by_name: Arc<RwLock<HashMap<String, Namespace>>>,
}

impl InMemoryNamespaceStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl NamespaceStore for InMemoryNamespaceStore {
	async fn find_by_name(&self, name: &str) -> Result<Option<Namespace>, Error> {
		Ok(self.by_name.read().unwrap().get(name).cloned())
	}

	async fn get_or_create(&self, name: &str) -> Result<Namespace, Error> {
		let mut guard = self.by_name.write().unwrap();
		if let Some(existing) = guard.get(name) {
			return Ok(existing.clone());
		}
		let namespace = Namespace::new(name);
		guard.insert(name.to_string(), namespace.clone());
		Ok(namespace)
	}
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepositoryStore {
	by_path: Arc<RwLock<HashMap<String, Repository>>>,
}

impl InMemoryRepositoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl RepositoryStore for InMemoryRepositoryStore {
	async fn find_by_path(&self, path: &RepositoryPath) -> Result<Option<Repository>, Error> {
		Ok(self.by_path.read().unwrap().get(path.as_str()).cloned())
	}

	async fn upsert(&self, repository: Repository) -> Result<Repository, Error> {
		let mut guard = self.by_path.write().unwrap();
		guard.insert(repository.path.as_str().to_string(), repository.clone());
		Ok(repository)
	}

	async fn rename(&self, path: &RepositoryPath, new_path: &RepositoryPath) -> Result<Option<Repository>, Error> {
		let mut guard = self.by_path.write().unwrap();
		let Some(mut repository) = guard.remove(path.as_str()) else {
			return Ok(None);
		};
		repository.path = new_path.clone();
		guard.insert(new_path.as_str().to_string(), repository.clone());
		Ok(Some(repository))
	}

	async fn find_descendants(&self, prefix: &RepositoryPath) -> Result<Vec<Repository>, Error> {
		Ok(self
			.by_path
			.read()
			.unwrap()
			.values()
			.filter(|repo| prefix.is_ancestor_of(&repo.path))
			.cloned()
			.collect())
	}

	async fn count_descendants(&self, prefix: &RepositoryPath) -> Result<u64, Error> {
		Ok(self.find_descendants(prefix).await?.len() as u64)
	}

	async fn rewrite_descendant_paths(
		&self,
		old_prefix: &RepositoryPath,
		new_prefix: &RepositoryPath,
	) -> Result<u64, Error> {
		let mut guard = self.by_path.write().unwrap();
		let descendants: Vec<String> = guard
			.keys()
			.filter(|path| old_prefix.as_str().len() < path.len() && path.starts_with(old_prefix.as_str()) && path.as_bytes()[old_prefix.as_str().len()] == b'/')
			.cloned()
			.collect();
		let mut rewritten = 0;
		for old_key in descendants {
			let mut repository = guard.remove(&old_key).expect("key just observed");
			let suffix = &old_key[old_prefix.as_str().len()..];
			let new_key = format!("{new_prefix}{suffix}");
			repository.path = RepositoryPath::parse(&new_key)?;
			guard.insert(new_key, repository);
			rewritten += 1;
		}
		Ok(rewritten)
	}
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
	by_digest: Arc<RwLock<HashMap<Digest, Blob>>>,
	links: Arc<RwLock<HashMap<(Uuid, Digest), ()>>>,
}

impl InMemoryBlobStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
	async fn find_by_digest(&self, digest: &Digest) -> Result<Option<Blob>, Error> {
		Ok(self.by_digest.read().unwrap().get(digest).cloned())
	}

	async fn upsert(&self, blob: Blob) -> Result<Blob, Error> {
		self.by_digest.write().unwrap().insert(blob.digest.clone(), blob.clone());
		Ok(blob)
	}

	async fn link(&self, link: BlobLink) -> Result<(), Error> {
		self.links.write().unwrap().insert((link.repository_id, link.digest), ());
		Ok(())
	}

	async fn is_linked(&self, repository_id: Uuid, digest: &Digest) -> Result<bool, Error> {
		Ok(self.links.read().unwrap().contains_key(&(repository_id, digest.clone())))
	}

	async fn total_size(&self, repository_id: Uuid) -> Result<u64, Error> {
		let links = self.links.read().unwrap();
		let by_digest = self.by_digest.read().unwrap();
		Ok(links
			.keys()
			.filter(|(repo, _)| *repo == repository_id)
			.filter_map(|(_, digest)| by_digest.get(digest))
			.map(|blob| blob.size_bytes)
			.sum())
	}
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryManifestStore {
	by_key: Arc<RwLock<HashMap<(Uuid, Digest), Manifest>>>,
	by_id: Arc<RwLock<HashMap<Uuid, Manifest>>>,
	references: Arc<RwLock<HashMap<Uuid, Vec<ManifestReference>>>>,
}

impl InMemoryManifestStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl ManifestStore for InMemoryManifestStore {
	async fn find_by_digest(&self, repository_id: Uuid, digest: &Digest) -> Result<Option<Manifest>, Error> {
		Ok(self.by_key.read().unwrap().get(&(repository_id, digest.clone())).cloned())
	}

	async fn upsert(&self, manifest: Manifest) -> Result<Manifest, Error> {
		self.by_key
			.write()
			.unwrap()
			.insert((manifest.repository_id, manifest.digest.clone()), manifest.clone());
		self.by_id.write().unwrap().insert(manifest.id, manifest.clone());
		Ok(manifest)
	}

	async fn add_reference(&self, reference: ManifestReference) -> Result<(), Error> {
		self.references
			.write()
			.unwrap()
			.entry(reference.parent_manifest_id)
			.or_default()
			.push(reference);
		Ok(())
	}

	async fn references_of(&self, manifest_id: Uuid) -> Result<Vec<ManifestReference>, Error> {
		Ok(self.references.read().unwrap().get(&manifest_id).cloned().unwrap_or_default())
	}
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTagStore {
	by_key: Arc<RwLock<HashMap<(Uuid, String), Tag>>>,
}

impl InMemoryTagStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl TagStore for InMemoryTagStore {
	async fn find(&self, repository_id: Uuid, name: &str) -> Result<Option<Tag>, Error> {
		Ok(self.by_key.read().unwrap().get(&(repository_id, name.to_string())).cloned())
	}

	async fn upsert(&self, tag: Tag) -> Result<Tag, Error> {
		self.by_key
			.write()
			.unwrap()
			.insert((tag.repository_id, tag.name.clone()), tag.clone());
		Ok(tag)
	}

	async fn list(&self, repository_id: Uuid, page: &PageRequest) -> Result<Page<Tag>, Error> {
		let guard = self.by_key.read().unwrap();
		let mut tags: Vec<Tag> = guard
			.values()
			.filter(|tag| tag.repository_id == repository_id)
			.filter(|tag| match &page.name {
				Some(prefix) => tag.name.starts_with(prefix.as_str()),
				None => true,
			})
			.cloned()
			.collect();
		tags.sort_by(|a, b| a.name.cmp(&b.name));
		if let Some(last) = &page.last {
			tags.retain(|tag| tag.name.as_str() > last.as_str());
		}
		let has_more = tags.len() > page.n as usize;
		tags.truncate(page.n as usize);
		Ok(Page { items: tags, has_more })
	}
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLeaseStore {
	by_target: Arc<RwLock<HashMap<String, RepositoryLease>>>,
}

impl InMemoryLeaseStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
	async fn find_by_path(&self, target_path: &RepositoryPath) -> Result<Option<RepositoryLease>, Error> {
		let guard = self.by_target.read().unwrap();
		Ok(guard
			.get(target_path.as_str())
			.filter(|lease| !lease.is_expired())
			.cloned())
	}

	async fn upsert(&self, lease: RepositoryLease, ttl: Duration) -> Result<Option<RepositoryLease>, Error> {
		let mut guard = self.by_target.write().unwrap();
		if let Some(existing) = guard.get(lease.target_path.as_str()) {
			if !existing.is_expired() && existing.granted_to != lease.granted_to {
				return Ok(None);
			}
		}
		let refreshed = RepositoryLease::new(lease.target_path.clone(), lease.granted_to, ttl);
		guard.insert(refreshed.target_path.as_str().to_string(), refreshed.clone());
		Ok(Some(refreshed))
	}

	async fn destroy(&self, target_path: &RepositoryPath, granted_to: &RepositoryPath) -> Result<(), Error> {
		let mut guard = self.by_target.write().unwrap();
		if guard.get(target_path.as_str()).is_some_and(|lease| lease.granted_to == *granted_to) {
			guard.remove(target_path.as_str());
		}
		Ok(())
	}
}
