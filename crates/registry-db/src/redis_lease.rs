//! A [`LeaseStore`] backed by a Redis-like cache, using `SET key value NX EX
//! ttl` for atomic granting and a `GET` then conditional `DEL` for
//! compare-and-delete `destroy`.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use registry_core::{Error, LeaseStore, RepositoryLease, RepositoryPath};

/// Stores leases as `registry:lease:<target_path>` -> `<granted_to>`, with
/// Redis's own expiry enforcing the TTL.
#[derive(Clone)]
pub struct RedisLeaseStore {
	pool: Pool,
}

impl RedisLeaseStore {
	pub fn new(pool: Pool) -> Self {
		Self { pool }
	}

	fn key(target_path: &RepositoryPath) -> String {
		format!("registry:lease:{target_path}")
	}

	async fn connection(&self) -> Result<deadpool_redis::Connection, Error> {
		self.pool
			.get()
			.await
			.map_err(|e| Error::Internal(format!("redis pool error: {e}")))
	}
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
	async fn find_by_path(&self, target_path: &RepositoryPath) -> Result<Option<RepositoryLease>, Error> {
		let mut conn = self.connection().await?;
		let (value, ttl_secs): (Option<String>, i64) = redis::pipe()
			.get(Self::key(target_path))
			.ttl(Self::key(target_path))
			.query_async(&mut conn)
			.await
			.map_err(|e| Error::Internal(format!("redis error: {e}")))?;

		let Some(granted_to) = value else {
			return Ok(None);
		};
		if ttl_secs <= 0 {
			return Ok(None);
		}
		Ok(Some(RepositoryLease::new(
			target_path.clone(),
			RepositoryPath::parse(&granted_to)?,
			Duration::from_secs(ttl_secs as u64),
		)))
	}

	async fn upsert(&self, lease: RepositoryLease, ttl: Duration) -> Result<Option<RepositoryLease>, Error> {
		let mut conn = self.connection().await?;
		let key = Self::key(&lease.target_path);

		let set_reply: Option<String> = redis::cmd("SET")
			.arg(&key)
			.arg(lease.granted_to.as_str())
			.arg("NX")
			.arg("EX")
			.arg(ttl.as_secs().max(1))
			.query_async(&mut conn)
			.await
			.map_err(|e| Error::Internal(format!("redis error: {e}")))?;
		let granted = set_reply.is_some();

		if granted {
			return Ok(Some(RepositoryLease::new(lease.target_path, lease.granted_to, ttl)));
		}

		// NX failed: either held by us (refresh) or by someone else (conflict).
		let existing: Option<String> = conn
			.get(&key)
			.await
			.map_err(|e| Error::Internal(format!("redis error: {e}")))?;
		match existing {
			Some(granted_to) if granted_to == lease.granted_to.as_str() => {
				let _: () = conn
					.expire(&key, ttl.as_secs().max(1) as i64)
					.await
					.map_err(|e| Error::Internal(format!("redis error: {e}")))?;
				Ok(Some(RepositoryLease::new(lease.target_path, lease.granted_to, ttl)))
			}
			_ => Ok(None),
		}
	}

	async fn destroy(&self, target_path: &RepositoryPath, granted_to: &RepositoryPath) -> Result<(), Error> {
		let mut conn = self.connection().await?;
		let key = Self::key(target_path);
		let existing: Option<String> = conn
			.get(&key)
			.await
			.map_err(|e| Error::Internal(format!("redis error: {e}")))?;
		if existing.as_deref() == Some(granted_to.as_str()) {
			let _: () = conn.del(&key).await.map_err(|e| Error::Internal(format!("redis error: {e}")))?;
		}
		Ok(())
	}
}
