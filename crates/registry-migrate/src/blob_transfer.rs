//! Copies a single blob, identified by digest, from one storage driver to
//! another.

use std::sync::Arc;

use registry_core::{blob_key, Digest, StorageDriver, StorageError};

/// Copies blobs by digest between two [`StorageDriver`]s, verifying content
/// on arrival. Never deletes from the source.
pub struct BlobTransferService {
	source: Arc<dyn StorageDriver>,
	destination: Arc<dyn StorageDriver>,
}

impl BlobTransferService {
	pub fn new(source: Arc<dyn StorageDriver>, destination: Arc<dyn StorageDriver>) -> Self {
		Self { source, destination }
	}

	/// Ensures `digest` is present on the destination, copying it from the
	/// source if necessary. A no-op success if the destination already has
	/// it.
	pub async fn ensure_present(&self, digest: &Digest) -> Result<(), StorageError> {
		let key = blob_key(digest);
		if self.destination.exists(&key).await? {
			return Ok(());
		}

		let bytes = self.source.read(&key).await?;
		let computed = Digest::from_bytes(&bytes);
		if &computed != digest {
			return Err(StorageError::VerificationFailed {
				expected: digest.clone(),
				computed,
			});
		}

		self.destination.write(&key, bytes).await?;

		let stored = self.destination.read(&key).await?;
		let verified = Digest::from_bytes(&stored);
		if &verified != digest {
			return Err(StorageError::VerificationFailed {
				expected: digest.clone(),
				computed: verified,
			});
		}

		Ok(())
	}

	/// Writes already-verified bytes (a manifest whose digest the caller
	/// already checked) to the destination under `key`, unless something is
	/// already there.
	pub async fn ensure_bytes_present(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
		if self.destination.exists(key).await? {
			return Ok(());
		}
		self.destination.write(key, bytes.to_vec()).await
	}
}
