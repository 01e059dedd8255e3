//! A [`StorageDriver`] rooted at a directory on the local filesystem, used
//! for both the old-side and new-side storage prefixes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use registry_core::storage::{ObjectKey, StorageDriver, StorageError};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Stores objects as plain files under `root`, one file per key, with
/// intermediate directories created on write.
#[derive(Debug, Clone)]
pub struct FilesystemStorageDriver {
	root: PathBuf,
}

impl FilesystemStorageDriver {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	fn resolve(&self, key: &str) -> PathBuf {
		self.root.join(key)
	}
}

fn io_error(key: &str, err: std::io::Error) -> StorageError {
	if err.kind() == std::io::ErrorKind::NotFound {
		StorageError::NotFound(key.to_string())
	} else {
		StorageError::Transport(format!("{key}: {err}"))
	}
}

#[async_trait]
impl StorageDriver for FilesystemStorageDriver {
	async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		fs::read(self.resolve(key)).await.map_err(|e| io_error(key, e))
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		match fs::metadata(self.resolve(key)).await {
			Ok(_) => Ok(true),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(io_error(key, e)),
		}
	}

	async fn size(&self, key: &str) -> Result<Option<u64>, StorageError> {
		match fs::metadata(self.resolve(key)).await {
			Ok(meta) => Ok(Some(meta.len())),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(io_error(key, e)),
		}
	}

	async fn list(&self, prefix: &str) -> Result<Vec<ObjectKey>, StorageError> {
		let dir = self.resolve(prefix);
		let mut out = Vec::new();
		walk(&dir, &self.root, &mut out).await?;
		Ok(out)
	}

	async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
		let path = self.resolve(key);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| io_error(key, e))?;
		}
		let tmp_path = path.with_extension("tmp");
		let mut file = fs::File::create(&tmp_path).await.map_err(|e| io_error(key, e))?;
		file.write_all(&bytes).await.map_err(|e| io_error(key, e))?;
		file.flush().await.map_err(|e| io_error(key, e))?;
		fs::rename(&tmp_path, &path).await.map_err(|e| io_error(key, e))
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.resolve(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(io_error(key, e)),
		}
	}
}

/// Recursively collects files under `dir`, reporting keys relative to `root`.
fn walk<'a>(
	dir: &'a Path,
	root: &'a Path,
	out: &'a mut Vec<ObjectKey>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), StorageError>> + Send + 'a>> {
	Box::pin(async move {
		let mut entries = match fs::read_dir(dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
			Err(e) => return Err(io_error(&dir.to_string_lossy(), e)),
		};
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| io_error(&dir.to_string_lossy(), e))?
		{
			let path = entry.path();
			let metadata = entry
				.metadata()
				.await
				.map_err(|e| io_error(&path.to_string_lossy(), e))?;
			if metadata.is_dir() {
				walk(&path, root, out).await?;
			} else {
				let relative = path
					.strip_prefix(root)
					.unwrap_or(&path)
					.to_string_lossy()
					.replace(std::path::MAIN_SEPARATOR, "/");
				out.push(ObjectKey {
					path: relative,
					size_bytes: metadata.len(),
				});
			}
		}
		Ok(())
	})
}
