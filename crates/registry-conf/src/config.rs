//! The typed configuration tree, mirroring `SPEC_FULL.md` §4.8/§6.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Pretty,
	Json,
}

impl Default for LogFormat {
	fn default() -> Self {
		LogFormat::Pretty
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
	pub url: Option<String>,
	#[serde(with = "humantime_seconds")]
	pub timeout: std::time::Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
	pub enabled: bool,
	pub root_directory: String,
	pub old_root_directory: String,
	#[serde(with = "humantime_seconds")]
	pub pre_import_timeout: std::time::Duration,
	#[serde(with = "humantime_seconds")]
	pub import_timeout: std::time::Duration,
	pub tag_concurrency: u32,
	pub max_concurrent_imports: u32,
	pub import_notification: NotificationConfig,
	/// Test-only artificial sleep injected into the importer; `None` in
	/// every real deployment.
	#[serde(with = "humantime_seconds_opt", default)]
	pub test_slow_import: Option<std::time::Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
	pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
	pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
	pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
	pub level: String,
	pub format: LogFormat,
}

/// The fully resolved configuration, assembled by [`crate::builder::ConfigBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub migration: MigrationConfig,
	pub database: DatabaseConfig,
	#[serde(default)]
	pub redis: RedisConfig,
	pub http: HttpConfig,
	pub log: LogConfig,
}

mod humantime_seconds {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		value.as_secs_f64().serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		let secs = f64::deserialize(deserializer)?;
		Ok(Duration::from_secs_f64(secs))
	}
}

mod humantime_seconds_opt {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
		value.map(|d| d.as_secs_f64()).serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
		let secs = Option::<f64>::deserialize(deserializer)?;
		Ok(secs.map(Duration::from_secs_f64))
	}
}
