use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use coursegate_policy_center::{load_tables_with_options, LoadOptions, PolicyTables};
use coursegate_validation_chain::calendar::{Clock, FixedClock, SystemClock};
use coursegate_validation_chain::PolicyService;
use tokio::fs;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::fixtures::FixtureDirectory;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    /// File the configuration came from; `None` when defaults are in use.
    pub path: Option<PathBuf>,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let candidate = match config_path {
        Some(path) => Some(path.clone()),
        None => {
            // Priority: ./config/coursegate.yaml > ~/.config/coursegate/config.yaml
            let local_config = PathBuf::from("config/coursegate.yaml");
            if local_config.exists() {
                Some(local_config)
            } else {
                dirs::config_dir().map(|mut path| {
                    path.push("coursegate");
                    path.push("config.yaml");
                    path
                })
            }
        }
    };

    let mut loaded = match candidate {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = if content.trim().is_empty() {
                Config::default()
            } else {
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            };
            info!("Loaded configuration from: {}", path.display());
            LoadedConfig {
                config,
                path: Some(path),
            }
        }
        Some(path) if config_path.is_some() => {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        other => {
            if let Some(path) = other {
                debug!("Config file not found, using defaults: {}", path.display());
            }
            LoadedConfig {
                config: Config::default(),
                path: None,
            }
        }
    };

    loaded.config.apply_env_overrides();
    Ok(loaded)
}

pub fn load_policy_tables(config: &Config) -> Result<PolicyTables> {
    for path in &config.policy_paths {
        if !path.exists() {
            warn!(path = %path.display(), "policy file missing; skipping");
        }
    }
    let options = LoadOptions {
        paths: config.policy_paths.clone(),
        include_env: true,
    };
    load_tables_with_options(&options).context("Failed to load policy tables")
}

pub async fn load_directory(path: Option<&Path>) -> Result<FixtureDirectory> {
    match path {
        Some(path) => FixtureDirectory::load(path)
            .await
            .with_context(|| format!("Failed to load directory {}", path.display())),
        None => {
            warn!("no directory configured; every token will be rejected");
            Ok(FixtureDirectory::empty())
        }
    }
}

/// Wire the policy service from configuration. `today` pins the calendar.
pub async fn build_service(config: &Config, today: Option<NaiveDate>) -> Result<PolicyService> {
    let tables = load_policy_tables(config)?.freeze();
    let directory = Arc::new(load_directory(config.directory_path.as_deref()).await?);
    let clock: Arc<dyn Clock> = match today {
        Some(date) => Arc::new(FixedClock(date)),
        None => Arc::new(SystemClock),
    };
    Ok(PolicyService::new(
        tables,
        directory.clone(),
        directory,
        clock,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn explicit_config_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level: debug").unwrap();
        writeln!(file, "policy_paths: [policy.yaml]").unwrap();
        let path = file.path().to_path_buf();

        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.log_level.as_deref(), Some("debug"));
    }

    #[tokio::test]
    async fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        assert!(load_config(Some(&path)).await.is_err());
    }

    #[tokio::test]
    async fn service_runs_without_directory() {
        let service = build_service(&Config::default(), None).await.unwrap();
        assert_eq!(service.tables().capacity.default_limit, 45);
    }
}
