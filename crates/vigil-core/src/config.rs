use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::refresher::DEFAULT_REFRESH_INTERVAL;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the local data directory for vigil.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("vigil");
    Ok(path)
}

/// User configuration read from `<data_dir>/config.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between periodic label refreshes
    pub refresh_interval_secs: u64,
    /// Label attached to the OS sleep assertion
    pub assertion_reason: String,
    /// Overrides `<data_dir>/vigil.db`
    pub database_path: Option<PathBuf>,
    /// Show the widget (and keep the display awake) as soon as the daemon starts
    pub start_active: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL.as_secs(),
            assertion_reason: String::from("Vigil keeping display awake"),
            database_path: None,
            start_active: true,
        }
    }
}

impl Config {
    /// Load `config.toml` from `data_dir`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Refresh period, never shorter than one second.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    #[must_use]
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir.join("vigil.db"))
    }

    /// Render as TOML, e.g. for `vigil config`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
