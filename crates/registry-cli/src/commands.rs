use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use registry_conf::Config;
use registry_core::RepositoryPath;
use registry_migrate::ImportType;
use serde::Serialize;

use crate::cli::Commands;

#[derive(Debug, Serialize)]
struct ImportReport {
	name: String,
	path: String,
	status: &'static str,
	detail: Option<String>,
}

pub async fn run(command: Commands, config: Config) -> Result<()> {
	match command {
		Commands::Serve => registry_server::serve(config).await,
		Commands::Migrate => run_migrate(config).await,
		Commands::Import { path, import_type } => run_import(config, path, import_type).await,
		Commands::ImportStatus { path } => run_import_status(config, path).await,
	}
}

async fn run_migrate(config: Config) -> Result<()> {
	let pool = sqlx::postgres::PgPoolOptions::new()
		.connect(&config.database.url)
		.await
		.context("connecting to the database")?;
	registry_db::postgres::run_migrations(&pool).await.context("applying migrations")?;
	println!("migrations applied");
	Ok(())
}

async fn run_import(config: Config, path: String, import_type: String) -> Result<()> {
	let repo_path = RepositoryPath::parse(&path).context("parsing repository path")?;
	let import_type = ImportType::from_str(&import_type).map_err(|e| anyhow::anyhow!(e.detail()))?;

	let state = registry_server::build_app_state(&config).await?;
	state
		.state_machine
		.start(repo_path.clone(), import_type)
		.await
		.map_err(|e| anyhow::anyhow!(e.detail()))?;

	loop {
		let repository = state
			.state_machine
			.status(&repo_path)
			.await
			.map_err(|e| anyhow::anyhow!(e.detail()))?
			.context("repository disappeared while waiting for the import to finish")?;
		if repository.migration_status.is_terminal() {
			print_report(&repository);
			return Ok(());
		}
		tokio::time::sleep(Duration::from_millis(200)).await;
	}
}

async fn run_import_status(config: Config, path: String) -> Result<()> {
	let repo_path = RepositoryPath::parse(&path).context("parsing repository path")?;
	let state = registry_server::build_app_state(&config).await?;

	match state.state_machine.status(&repo_path).await.map_err(|e| anyhow::anyhow!(e.detail()))? {
		Some(repository) => print_report(&repository),
		None => println!("no import status recorded for {path}"),
	}
	Ok(())
}

fn print_report(repository: &registry_core::Repository) {
	let report = ImportReport {
		name: repository.name().to_string(),
		path: repository.path.as_str().to_string(),
		status: repository.migration_status.as_str(),
		detail: repository.migration_error.clone(),
	};
	println!("{}", serde_json::to_string_pretty(&report).expect("ImportReport always serializes"));
}
