mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use registry_conf::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let config = config::load(cli.config.clone())?;
	init_tracing(&config.log);

	commands::run(cli.command, config).await
}

fn init_tracing(log: &registry_conf::LogConfig) {
	let filter = tracing_subscriber::EnvFilter::try_new(&log.level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
	match &log.format {
		LogFormat::Json => subscriber.json().init(),
		LogFormat::Pretty => subscriber.init(),
	}
}
