use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::recommend::DEFAULT_REVIEW_LIMIT;

const APP_DIR: &str = "osce-prep";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DB_NAME: &str = "osce.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    /// Replaces the bundled content when set
    pub catalog_path: Option<PathBuf>,
    pub review_limit: usize,
    /// Fraction of correct answers needed to complete a session
    pub pass_mark: f64,
    pub notification_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            catalog_path: None,
            review_limit: DEFAULT_REVIEW_LIMIT,
            pass_mark: 0.7,
            notification_ttl_secs: 5,
        }
    }
}

impl Config {
    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pass_mark) {
            return Err(Error::Config(format!(
                "pass_mark must be between 0 and 1, got {}",
                self.pass_mark
            )));
        }
        if self.review_limit == 0 {
            return Err(Error::Config("review_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }

    /// `OSCE_PREP_DB` wins over the config file, which wins over the default.
    pub fn database_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("OSCE_PREP_DB") {
            return PathBuf::from(path);
        }
        match &self.database_path {
            Some(path) => path.clone(),
            None => {
                let dir = app_dir();
                std::fs::create_dir_all(&dir).ok();
                dir.join(DEFAULT_DB_NAME)
            }
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("OSCE_PREP_CONFIG") {
        return PathBuf::from(path);
    }
    app_dir().join(CONFIG_FILE)
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
