//! On-disk configuration for the demo binary and embedders
//!
//! Stored as TOML under the platform config directory. A missing file is
//! replaced by defaults on first run; a file that fails to parse is an error
//! rather than being silently overwritten.

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::controller::ReaderSettings;

const CONFIG_DIR: &str = "joystick-mirror";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MirrorConfig {
    /// Reader sleep between polls
    pub poll_interval_ms: u64,
    /// Reader throughput log window
    pub stats_interval_secs: u64,
    /// Demo refresh period
    pub display_interval_ms: u64,
    /// Device to open without prompting
    pub device_index: Option<i32>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            stats_interval_secs: 10,
            display_interval_ms: 50,
            device_index: None,
        }
    }
}

impl MirrorConfig {
    /// `<config_dir>/joystick-mirror/config.toml`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        fs::write(path, content).map_err(|e| eyre!("Failed to write config file: {}", e))?;
        Ok(())
    }

    /// Load `path`, writing the defaults there first if it does not exist.
    pub fn ensure_default_config(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Creating default configuration at {}", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }
        Self::load(path)
    }

    pub fn reader_settings(&self) -> Result<ReaderSettings> {
        let stats_interval = i64::try_from(self.stats_interval_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                eyre!(
                    "stats_interval_secs = {} is out of range",
                    self.stats_interval_secs
                )
            })?;

        Ok(ReaderSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            stats_interval,
            ..ReaderSettings::default()
        })
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let config = MirrorConfig::from_toml("poll_interval_ms = 4\ndevice_index = 1\n").unwrap();
        assert_eq!(config.poll_interval_ms, 4);
        assert_eq!(config.device_index, Some(1));
        assert_eq!(config.display_interval_ms, 50);

        let settings = config.reader_settings().unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(4));
        assert_eq!(settings.stats_interval, chrono::Duration::seconds(10));
    }

    #[test]
    fn invalid_file_is_an_error() {
        assert!(MirrorConfig::from_toml("poll_interval_ms = \"fast\"").is_err());
        assert!(MirrorConfig::from_toml("stats_interval_secs = -5").is_err());
    }

    #[test]
    fn oversized_stats_interval_is_rejected() {
        let config = MirrorConfig::from_toml("stats_interval_secs = 9223372036854775807").unwrap();
        assert!(config.reader_settings().is_err());

        let config = MirrorConfig {
            stats_interval_secs: u64::MAX,
            ..MirrorConfig::default()
        };
        assert!(config.reader_settings().is_err());
    }

    #[test]
    fn ensure_default_config_writes_then_reloads() {
        let dir = std::env::temp_dir().join(format!("joystick-mirror-test-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);
        let _ = fs::remove_dir_all(&dir);

        let created = MirrorConfig::ensure_default_config(&path).unwrap();
        assert_eq!(created, MirrorConfig::default());
        assert!(path.exists());

        let edited = MirrorConfig {
            device_index: Some(2),
            ..MirrorConfig::default()
        };
        edited.save(&path).unwrap();
        assert_eq!(MirrorConfig::ensure_default_config(&path).unwrap(), edited);

        fs::remove_dir_all(&dir).unwrap();
    }
}
