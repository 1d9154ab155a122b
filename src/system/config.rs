//! Centralized configuration management

use crate::types::*;
use anyhow::{bail, Context, Result};
use embassy_time::Duration;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "COFFEE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scale: ScaleConfig,
    pub ui: UiConfig,
    pub storage: StorageConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Samples kept for the dispersion check.
    pub window: usize,
    pub change_threshold_g: f32,
    pub settle_threshold_g: f32,
    pub min_mug_g: f32,
    pub max_mug_g: f32,
    /// Raw reads folded into one published sample.
    pub smoothing_window: usize,
    pub smoothing: SmoothingMethod,
    /// Pause between samples, 0 means free-running.
    pub sample_interval_ms: u64,
    pub ack_timeout_ms: u64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_SETTLE_WINDOW,
            change_threshold_g: DEFAULT_CHANGE_THRESHOLD_G,
            settle_threshold_g: DEFAULT_SETTLE_THRESHOLD_G,
            min_mug_g: DEFAULT_MIN_MUG_G,
            max_mug_g: DEFAULT_MAX_MUG_G,
            smoothing_window: 3,
            smoothing: SmoothingMethod::Median,
            sample_interval_ms: 0,
            ack_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub width: usize,
    pub rows: usize,
    pub default_timeout_ms: u64,
    pub mug_timeout_ms: u64,
    pub info_timeout_ms: u64,
    /// `None` disables retroactive attribution of button presses.
    pub lookbehind_ms: Option<u64>,
    pub poll_interval_ms: u64,
    pub message_ms: u64,
    pub confirm_message_ms: u64,
    pub scroll_interval_ms: u64,
    pub blink_interval_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            width: 16,
            rows: 2,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            mug_timeout_ms: MUG_PAGE_TIMEOUT_MS,
            info_timeout_ms: INFO_PAGE_TIMEOUT_MS,
            lookbehind_ms: Some(LOOKBEHIND_MS),
            poll_interval_ms: 500,
            message_ms: 1_000,
            confirm_message_ms: 2_000,
            scroll_interval_ms: 200,
            blink_interval_ms: 500,
        }
    }
}

impl UiConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn lookbehind(&self) -> Option<Duration> {
        self.lookbehind_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("app_data.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Run the real halt/reboot commands from the shutdown pages.
    pub allow_shutdown: bool,
    /// Shown on the hostname page when host commands are disabled.
    pub simulated_hostname: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            allow_shutdown: false,
            simulated_hostname: "127.0.0.1".to_string(),
        }
    }
}

impl AppConfig {
    /// Read a JSON configuration file. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Path from the first CLI argument, then the environment, then `coffee.json`.
    pub fn resolve_path(arg: Option<String>) -> PathBuf {
        arg.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("coffee.json"))
    }

    pub fn validate(&self) -> Result<()> {
        let scale = &self.scale;
        if scale.window < 2 || scale.window > MAX_SETTLE_WINDOW {
            bail!(
                "scale.window must be within 2..={}, got {}",
                MAX_SETTLE_WINDOW,
                scale.window
            );
        }
        if scale.change_threshold_g <= 0.0 || scale.settle_threshold_g <= 0.0 {
            bail!("scale thresholds must be positive");
        }
        if scale.min_mug_g <= 0.0 || scale.min_mug_g >= scale.max_mug_g {
            bail!(
                "admissible mug range is empty: {}..{}",
                scale.min_mug_g,
                scale.max_mug_g
            );
        }
        if scale.smoothing_window == 0 {
            bail!("scale.smoothing_window must be at least 1");
        }

        let ui = &self.ui;
        if ui.width < 8 || ui.rows < 2 {
            bail!("display must be at least 8x2, got {}x{}", ui.width, ui.rows);
        }
        if ui.default_timeout_ms == 0 || ui.mug_timeout_ms == 0 || ui.info_timeout_ms == 0 {
            bail!("page timeouts must be non-zero");
        }
        Ok(())
    }
}
