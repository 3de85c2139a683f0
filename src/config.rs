// Configuration file handling

use crate::screen::Reconcile;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

const APP_NAME: &str = "tasklist";
const CONFIG_ENV: &str = "TASKLIST_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory that holds the `.tasklist` store
    pub store_path: Option<PathBuf>,
    pub reconcile: Reconcile,
    /// One of error, warn, info, debug, trace
    pub log_level: Option<String>,
}

impl Config {
    /// Load from an explicit path, `$TASKLIST_CONFIG`, or the default location
    ///
    /// A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(p) => Some(PathBuf::from(p)),
                None => default_config_file(),
            },
        };

        match path {
            Some(p) if p.exists() => Self::from_file(&p),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Store directory: the override, then the configured path, then the data dir
    pub fn store_path(&self, cli_override: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_override {
            return p.to_path_buf();
        }
        if let Some(p) = &self.store_path {
            return p.clone();
        }
        dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn log_level(&self) -> Result<Option<Level>> {
        self.log_level
            .as_deref()
            .map(|s| {
                s.parse::<Level>()
                    .map_err(|_| eyre!("Invalid log_level: {} (expected error, warn, info, debug or trace)", s))
            })
            .transpose()
    }
}

pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.reconcile, Reconcile::Refetch);
        assert!(config.store_path.is_none());
        assert_eq!(config.log_level().unwrap(), None);
    }

    #[test]
    fn test_parse_yaml() {
        let config = Config::from_yaml("store_path: /tmp/tasks\nreconcile: splice\nlog_level: debug\n").unwrap();
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/tasks")));
        assert_eq!(config.reconcile, Reconcile::Splice);
        assert_eq!(config.log_level().unwrap(), Some(Level::DEBUG));
    }

    #[test]
    fn test_partial_and_empty_yaml() {
        let config = Config::from_yaml("reconcile: splice\n").unwrap();
        assert_eq!(config.reconcile, Reconcile::Splice);
        assert!(config.store_path.is_none());

        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::from_yaml("reconcile: sometimes\n").is_err());

        let config = Config::from_yaml("log_level: loud\n").unwrap();
        assert!(config.log_level().is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(Some(&temp.path().join("missing.yaml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "reconcile: splice\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.reconcile, Reconcile::Splice);
    }

    #[test]
    fn test_store_path_precedence() {
        let config = Config {
            store_path: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        assert_eq!(config.store_path(Some(Path::new("/from/cli"))), PathBuf::from("/from/cli"));
        assert_eq!(config.store_path(None), PathBuf::from("/from/config"));
    }
}
