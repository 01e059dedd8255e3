//! Layered assembly of [`Config`]: compiled-in defaults, an optional TOML
//! file, then `REGISTRY_`-prefixed environment variables, in ascending
//! priority.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("reading config file {path:?}: {source}")]
	ReadFile { path: PathBuf, source: std::io::Error },

	#[error("parsing config file {path:?} as TOML: {source}")]
	ParseToml { path: PathBuf, source: toml::de::Error },

	#[error("environment variable {key:?} could not be applied: {detail}")]
	InvalidEnvValue { key: String, detail: String },

	#[error("assembling configuration: {0}")]
	Invalid(String),
}

/// Default values for every recognized key, expressed once here so the
/// builder never silently falls back to a default for a value an explicit
/// source set and got wrong.
fn defaults() -> Value {
	serde_json::json!({
		"migration": {
			"enabled": true,
			"root_directory": "/var/lib/registry",
			"old_root_directory": "/var/lib/registry/old",
			"pre_import_timeout": 60.0,
			"import_timeout": 600.0,
			"tag_concurrency": 4,
			"max_concurrent_imports": 10,
			"import_notification": {
				"url": null,
				"timeout": 5.0
			},
			"test_slow_import": null
		},
		"database": {
			"url": "postgres://localhost/registry"
		},
		"redis": {
			"url": null
		},
		"http": {
			"bind_address": "0.0.0.0:5000"
		},
		"log": {
			"level": "info",
			"format": "pretty"
		}
	})
}

/// Recursively merges `overlay` into `base`, keeping `base`'s entries that
/// `overlay` does not mention.
fn merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base_map), Value::Object(overlay_map)) => {
			for (key, value) in overlay_map {
				match base_map.get_mut(&key) {
					Some(existing) => merge(existing, value),
					None => {
						base_map.insert(key, value);
					}
				}
			}
		}
		(base_slot, overlay_value) => *base_slot = overlay_value,
	}
}

/// Sets `value` at the dotted `path` (e.g. `migration.max_concurrent_imports`)
/// inside `root`, creating intermediate objects as needed.
fn set_path(root: &mut Value, path: &[&str], value: Value) {
	let Some((head, rest)) = path.split_first() else {
		return;
	};
	if !root.is_object() {
		*root = Value::Object(Map::new());
	}
	let map = root.as_object_mut().expect("just ensured object");
	if rest.is_empty() {
		map.insert((*head).to_string(), value);
	} else {
		let entry = map.entry((*head).to_string()).or_insert_with(|| Value::Object(Map::new()));
		set_path(entry, rest, value);
	}
}

/// Parses an environment variable's raw string into the most specific JSON
/// scalar it looks like — this is how `max_concurrent_imports=3` ends up as
/// a number rather than the string `"3"` once deserialized into [`Config`].
fn parse_env_scalar(raw: &str) -> Value {
	if let Ok(b) = raw.parse::<bool>() {
		return Value::Bool(b);
	}
	if let Ok(i) = raw.parse::<i64>() {
		return Value::from(i);
	}
	if let Ok(f) = raw.parse::<f64>() {
		return Value::from(f);
	}
	if raw == "null" {
		return Value::Null;
	}
	Value::String(raw.to_string())
}

/// Builds a [`Config`] from compiled-in defaults, an optional TOML file, and
/// `REGISTRY_`-prefixed environment variables.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
	toml_path: Option<PathBuf>,
	env_prefix: String,
	env_overrides: Vec<(String, String)>,
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			toml_path: None,
			env_prefix: "REGISTRY_".to_string(),
			env_overrides: Vec::new(),
		}
	}

	/// Reads and merges `path` as a TOML file, if set. Absence of a file at
	/// this path (when set) is a hard error — an explicitly configured path
	/// that does not resolve is treated as a caller mistake, not silently
	/// skipped.
	pub fn toml_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.toml_path = Some(path.into());
		self
	}

	/// Overrides the environment variable prefix (default `REGISTRY_`);
	/// mainly useful for tests that want isolation from the ambient
	/// environment.
	pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Supplies the environment directly instead of reading
	/// `std::env::vars()`, so tests never depend on process-global state.
	pub fn env_source(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
		self.env_overrides = vars.into_iter().collect();
		self
	}

	/// Populates the environment source from the real process environment,
	/// filtered to this builder's prefix.
	pub fn with_process_env(self) -> Self {
		let prefix = self.env_prefix.clone();
		let vars = std::env::vars().filter(|(key, _)| key.starts_with(&prefix));
		self.env_source(vars)
	}

	pub fn build(self) -> Result<Config, ConfigError> {
		let mut tree = defaults();

		if let Some(path) = &self.toml_path {
			merge(&mut tree, self.load_toml_file(path)?);
		}

		for (key, raw_value) in &self.env_overrides {
			let Some(suffix) = key.strip_prefix(&self.env_prefix) else {
				continue;
			};
			let path_owned: Vec<String> = suffix.split("__").map(|s| s.to_ascii_lowercase()).collect();
			let path_refs: Vec<&str> = path_owned.iter().map(String::as_str).collect();
			set_path(&mut tree, &path_refs, parse_env_scalar(raw_value));
		}

		serde_json::from_value(tree).map_err(|e| ConfigError::Invalid(e.to_string()))
	}

	fn load_toml_file(&self, path: &Path) -> Result<Value, ConfigError> {
		let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
			path: path.to_path_buf(),
			source,
		})?;
		let toml_value: toml::Value = toml::from_str(&raw).map_err(|source| ConfigError::ParseToml {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::to_value(toml_value).map_err(|e| ConfigError::Invalid(e.to_string()))
	}
}
