//! An in-memory [`StorageDriver`] fake, backing every test that doesn't
//! need real filesystem semantics.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use registry_core::storage::{ObjectKey, StorageDriver, StorageError};

#[derive(Debug, Default)]
pub struct InMemoryStorageDriver {
	objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStorageDriver {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageDriver for InMemoryStorageDriver {
	async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.objects
			.lock()
			.unwrap()
			.get(key)
			.cloned()
			.ok_or_else(|| StorageError::NotFound(key.to_string()))
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.objects.lock().unwrap().contains_key(key))
	}

	async fn size(&self, key: &str) -> Result<Option<u64>, StorageError> {
		Ok(self.objects.lock().unwrap().get(key).map(|v| v.len() as u64))
	}

	async fn list(&self, prefix: &str) -> Result<Vec<ObjectKey>, StorageError> {
		Ok(self
			.objects
			.lock()
			.unwrap()
			.iter()
			.filter(|(key, _)| key.starts_with(prefix))
			.map(|(key, value)| ObjectKey {
				path: key.clone(),
				size_bytes: value.len() as u64,
			})
			.collect())
	}

	async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
		self.objects.lock().unwrap().insert(key.to_string(), bytes);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.objects.lock().unwrap().remove(key);
		Ok(())
	}
}
