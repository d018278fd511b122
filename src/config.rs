//! Configuration and platform paths.
//!
//! Settings live in a single JSON file under the platform config directory
//! (overridable with `--config-dir`). Every field has a serde default, so a
//! partial or missing file yields working settings instead of an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::core::recovery::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};

/// Resolved path roots, honoring a CLI override.
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        Self { config_dir }
    }
}

/// Path of a file under the config root.
pub fn config_file(name: &str, paths: &PathConfig) -> PathBuf {
    config_root(paths).join(name)
}

/// Path of a file under the data root (logs, traces).
pub fn data_file(name: &str, paths: &PathConfig) -> PathBuf {
    let root = match &paths.config_dir {
        Some(dir) => dir.clone(),
        None => dirs_next::data_dir()
            .map(|d| d.join("playhead"))
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    root.join(name)
}

fn config_root(paths: &PathConfig) -> PathBuf {
    match &paths.config_dir {
        Some(dir) => dir.clone(),
        None => dirs_next::config_dir()
            .map(|d| d.join("playhead"))
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// Stall-recovery tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Automatic recovery attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between delayed re-probes, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Screen behavior tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Start playback as soon as the asset is ready.
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
    /// Progress-report cadence, updates per second.
    #[serde(default = "default_time_update_hz")]
    pub time_update_hz: f64,
}

fn default_autoplay() -> bool {
    true
}

fn default_time_update_hz() -> f64 {
    crate::core::engine::TIME_UPDATE_HZ
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            autoplay: default_autoplay(),
            time_update_hz: default_time_update_hz(),
        }
    }
}

/// Everything the player reads at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub recovery: RecoveryConfig,
    pub screen: ScreenConfig,
}

impl PlayerConfig {
    /// Load from `path`. A missing file yields the defaults; a malformed one
    /// is an error worth surfacing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating config dir {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }
}
