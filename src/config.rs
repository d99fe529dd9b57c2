use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::{cplog_debug, Error, Result};

/// Engine tuning knobs, loaded from ~/.critpath/critpath.toml when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many times a mutation is retried after a concurrent-modification
    /// conflict before the error is surfaced to the caller.
    #[serde(default = "default_max_persist_retries")]
    pub max_persist_retries: u32,
    /// Calendar date mapped to day 0 of every project. Purely for callers
    /// converting day offsets to dates; the solver never reads it.
    pub project_epoch: Option<NaiveDate>,
}

fn default_max_persist_retries() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_persist_retries: default_max_persist_retries(),
            project_epoch: None,
        }
    }
}

impl EngineConfig {
    pub fn engine_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".critpath"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::engine_dir()?.join("critpath.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        cplog_debug!("EngineConfig::load path={}", path.display());
        if !path.exists() {
            cplog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        cplog_debug!(
            "Config loaded: max_persist_retries={}, project_epoch={:?}",
            config.max_persist_retries,
            config.project_epoch
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::engine_dir()?;
        cplog_debug!("EngineConfig::save dir={}", dir.display());
        if !dir.exists() {
            cplog_debug!("Creating engine directory");
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        cplog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
