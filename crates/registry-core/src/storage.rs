//! The capability trait every blob storage backend (filesystem, object
//! storage) implements, and the errors it can raise.
//!
//! Keys are plain slash-delimited strings rooted at a configured prefix —
//! byte-level storage, not a content-addressed store in its own right.
//! [`crate::digest::Digest`]-addressing is a convention the blob transfer
//! service layers on top via [`blob_key`] / [`manifest_key`].

use async_trait::async_trait;

use crate::digest::Digest;

/// Errors a [`StorageDriver`] can raise. These are distinct from [`crate::Error`]
/// because a transfer failure needs to be classified (retryable vs. not)
/// before it is wrapped into the domain error returned to callers.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("object not found: key={0}")]
	NotFound(String),

	#[error("blob verification failed: expected digest={expected}, computed digest={computed}")]
	VerificationFailed { expected: Digest, computed: Digest },

	#[error("destination storage is full or over quota")]
	DestinationFull,

	#[error("storage transport error: {0}")]
	Transport(String),
}

impl StorageError {
	/// Whether retrying the same transfer without operator intervention
	/// could plausibly succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, StorageError::Transport(_))
	}
}

/// A key listed by [`StorageDriver::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
	pub path: String,
	pub size_bytes: u64,
}

/// A root-prefixed byte store, abstracting over the old-side and new-side
/// storage backends so the importer can be written once against either.
/// Implementations live in `registry-storage`.
#[async_trait]
pub trait StorageDriver: Send + Sync {
	/// Reads the full contents of the object at `key`.
	async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// `true` if an object exists at `key`.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// The byte size of the object at `key`, or `Ok(None)` if absent.
	async fn size(&self, key: &str) -> Result<Option<u64>, StorageError>;

	/// Lists every object whose key is prefixed by `prefix`.
	async fn list(&self, prefix: &str) -> Result<Vec<ObjectKey>, StorageError>;

	/// Writes `bytes` at `key`, creating any intermediate directories the
	/// backend needs.
	async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

	/// Removes the object at `key`, if present.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// The conventional key a content-addressed blob is stored under, mirroring
/// the Distribution filesystem layout (`blobs/<algorithm>/<aa>/<hex>/data`).
pub fn blob_key(digest: &Digest) -> String {
	let hex = digest.hex();
	format!("blobs/{}/{}/{}/data", Digest::ALGORITHM, &hex[..2], hex)
}

/// The key a manifest's raw JSON is stored under once imported, keyed by
/// its own digest (manifests live in the same content-addressed namespace
/// as blobs).
pub fn manifest_key(digest: &Digest) -> String {
	blob_key(digest)
}

/// The directory a repository's manifest revision pointer files live under.
pub fn manifest_revisions_prefix(repo_path: &str) -> String {
	format!("repositories/{repo_path}/_manifests/revisions/{}/", Digest::ALGORITHM)
}

/// The directory a repository's tag pointer files live under.
pub fn tags_prefix(repo_path: &str) -> String {
	format!("repositories/{repo_path}/_manifests/tags/")
}

/// The `current/link` pointer file for one tag, whose contents are the
/// digest (as `algorithm:hex` text) it currently resolves to.
pub fn tag_current_link_key(repo_path: &str, tag_name: &str) -> String {
	format!("repositories/{repo_path}/_manifests/tags/{tag_name}/current/link")
}
