//! `registryctl`: an operator-facing binary mirroring the HTTP control
//! plane for out-of-band and scripted use (`SPEC_FULL.md` §4.10).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "registryctl")]
#[command(about = "Operate the container registry migration control plane", long_about = None)]
#[command(version)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,

	/// Path to a TOML config file; falls back to REGISTRY_CONFIG, then compiled-in defaults.
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Verbosity level (can be repeated for more output)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	pub verbosity: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
	/// Load `Config`, wire the stores/drivers, and run the HTTP server until SIGINT/SIGTERM.
	Serve,

	/// Apply pending SQL migrations against `database.url` and exit.
	Migrate,

	/// Admit a `pre` or `final` import and wait for the background worker to reach a terminal state.
	Import {
		/// Repository path, e.g. `group/sub/name`
		#[arg(value_name = "PATH")]
		path: String,

		/// pre | final
		#[arg(long = "type", value_name = "TYPE")]
		import_type: String,
	},

	/// Print the current migration status row for a repository, or report its absence.
	ImportStatus {
		#[arg(value_name = "PATH")]
		path: String,
	},
}
