use std::path::PathBuf;

use anyhow::{Context, Result};
use registry_conf::{Config, ConfigBuilder};

/// `--config <path>`, falling back to `REGISTRY_CONFIG`, then the
/// compiled-in defaults layered with `REGISTRY_`-prefixed env vars.
pub fn load(explicit_path: Option<PathBuf>) -> Result<Config> {
	let mut builder = ConfigBuilder::new().with_process_env();
	let toml_path = explicit_path.or_else(|| std::env::var("REGISTRY_CONFIG").ok().map(PathBuf::from));
	if let Some(path) = toml_path {
		builder = builder.toml_file(path);
	}
	builder.build().context("loading configuration")
}
