use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use docent_agent::{AppConfig, Verbosity};
use tracing_subscriber::EnvFilter;

/// Watch a folder of documents and answer questions about them.
#[derive(Debug, Parser)]
#[command(name = "docent", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of documents to watch and index.
    #[arg(long)]
    root: Option<PathBuf>,

    /// SQLite database file for the vector index.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Base URL of the OpenAI-compatible model endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Show only the first line of each answer.
    #[arg(long)]
    concise: bool,
}

impl Cli {
    fn into_config(self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(db) = self.db {
            config.db_path = db;
        }
        if let Some(endpoint) = self.endpoint {
            config.model.endpoint = endpoint;
        }
        if self.concise {
            config.verbosity = Verbosity::Concise;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    docent_agent::run(config).await
}
