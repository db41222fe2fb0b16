use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::env::CliArgs;
use super::evaluate::cmd_evaluate;
use super::policy::cmd_policy;
use super::runtime::{init_logging, load_config, LoadedConfig, DEFAULT_LOG_LEVEL};

pub async fn run() -> Result<ExitCode> {
    let cli = CliArgs::parse();

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let level = cli
        .log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    init_logging(level, cli.debug)?;

    info!("Starting coursegate v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &path {
        info!("Using configuration from {}", path.display());
    }

    let outcome = match cli.command {
        Commands::Evaluate(args) => cmd_evaluate(args, &config).await,
        Commands::Policy(args) => cmd_policy(args, &config).await.map(|()| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => {
            info!("Command completed");
            Ok(code)
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
