//! Typed, layered configuration for the registry migration control plane.

mod builder;
mod config;

pub use builder::{ConfigBuilder, ConfigError};
pub use config::{
	Config, DatabaseConfig, HttpConfig, LogConfig, LogFormat, MigrationConfig, NotificationConfig,
	RedisConfig,
};
