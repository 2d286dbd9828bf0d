use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone used for clock-time expressions; local time when unset.
    pub timezone: Option<String>,
    pub auto_quit: bool,
    /// Length of the timer started when the expression can't be parsed.
    pub fallback_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezone: None,
            auto_quit: false,
            fallback_minutes: 1,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("failed to read {}: {e}", path.display());
                return Config::default();
            }
        };
        toml::from_str(&contents).unwrap_or_else(|e| {
            warn!("ignoring malformed config {}: {e}", path.display());
            Config::default()
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ttimer")
            .join("config.toml")
    }

    /// Stores `zone` as the preferred timezone. Returns whether it changed.
    pub fn remember_timezone(&mut self, zone: &str) -> bool {
        if self.timezone.as_deref() == Some(zone) {
            return false;
        }
        self.timezone = Some(zone.to_string());
        true
    }
}
