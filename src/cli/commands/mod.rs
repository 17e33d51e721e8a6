//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check_config;
mod extract;
mod serve;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use wistia_extract::config::{Config, StrategyKind};

#[derive(Parser)]
#[command(name = "wistia-extract")]
#[command(about = "Find the Wistia video ID behind a page URL")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Fetch strategy (overrides config and WISTIA_EXTRACT_STRATEGY)
    #[arg(short, long, global = true, value_enum)]
    strategy: Option<StrategyKind>,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP extraction endpoint
    Serve {
        /// Address to bind: PORT, HOST or HOST:PORT
        #[arg(short, long, default_value = "127.0.0.1:3030")]
        bind: String,
    },

    /// Extract the Wistia ID for one URL and print the JSON result
    Extract {
        /// Page or embed URL
        url: String,
        /// Login email for sites behind a member login
        #[arg(long, env = "WISTIA_EXTRACT_EMAIL")]
        email: Option<String>,
        /// Login password
        #[arg(long, env = "WISTIA_EXTRACT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Disable the "ID near the word wistia" fallback rule
        #[arg(long)]
        no_contextual: bool,
    },

    /// Load and validate configuration, then print the resolved settings
    CheckConfig,
}

/// Load the config file (explicit or discovered) with env overrides applied.
async fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };
    Ok(config.with_env_overrides()?)
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).await?;
    if let Some(strategy) = cli.strategy {
        config.strategy = Some(strategy);
    }
    if let Commands::Extract {
        no_contextual: true,
        ..
    } = &cli.command
    {
        config.contextual_fallback = Some(false);
    }

    let source_path = config.source_path.clone();
    let settings = config.into_settings()?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::Extract {
            url,
            email,
            password,
            ..
        } => extract::cmd_extract(&settings, &url, email, password).await,
        Commands::CheckConfig => {
            check_config::cmd_check_config(&settings, source_path.as_deref()).await
        }
    }
}
