//! CLI configuration file model.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

pub const POLICY_PATH_ENV: &str = "COURSEGATE_POLICY_PATH";
pub const DIRECTORY_ENV: &str = "COURSEGATE_DIRECTORY";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Policy table overlays, applied in order over the built-in defaults.
    pub policy_paths: Vec<PathBuf>,
    /// YAML fixture holding the subjects and courses the CLI resolves against.
    pub directory_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Environment variables take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env_path(POLICY_PATH_ENV) {
            info!(path = %path.display(), "policy path overridden from {}", POLICY_PATH_ENV);
            self.policy_paths = vec![path];
        }
        if let Some(path) = env_path(DIRECTORY_ENV) {
            info!(path = %path.display(), "directory overridden from {}", DIRECTORY_ENV);
            self.directory_path = Some(path);
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_yaml() {
        let config: Config = serde_yaml::from_str("log_level: debug\n").unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.policy_paths.is_empty());
        assert!(config.directory_path.is_none());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(serde_yaml::from_str::<Config>("headless: true\n").is_err());
    }
}
