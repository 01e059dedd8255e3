//! `GET /gitlab/v1/health`: checks the DB pool and, if configured, the
//! lease backend.

use async_trait::async_trait;
use deadpool_redis::Pool as RedisPool;
use registry_http::HealthCheck;
use sqlx::PgPool;

pub struct DatabaseHealth {
	pool: PgPool,
	redis: Option<RedisPool>,
}

impl DatabaseHealth {
	pub fn new(pool: PgPool, redis: Option<RedisPool>) -> Self {
		Self { pool, redis }
	}
}

#[async_trait]
impl HealthCheck for DatabaseHealth {
	async fn check(&self) -> bool {
		if sqlx::query("SELECT 1").execute(&self.pool).await.is_err() {
			return false;
		}
		if let Some(redis) = &self.redis {
			match redis.get().await {
				Ok(mut conn) => {
					if redis::cmd("PING").query_async::<String>(&mut conn).await.is_err() {
						return false;
					}
				}
				Err(_) => return false,
			}
		}
		true
	}
}
