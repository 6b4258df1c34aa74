use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::content::{FontSize, LayoutConfig};
use crate::gaze::Viewport;

const ENABLE_LOGS: bool = true;
use crate::log_warn;

/// Where gaze input comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TrackingMode {
    #[default]
    ArFaceTracking,
    /// No gaze input; definitions appear on tap and hide after a delay.
    TapFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EyeReadConfig {
    pub tracking_mode: TrackingMode,
    pub dwell_threshold_ms: u64,
    pub definition_display_ms: u64,
    pub viewport: Viewport,
    pub font_size: FontSize,
    pub layout: LayoutConfig,
}

impl Default for EyeReadConfig {
    fn default() -> Self {
        Self {
            tracking_mode: TrackingMode::ArFaceTracking,
            dwell_threshold_ms: 3_000,
            definition_display_ms: 5_000,
            viewport: Viewport::default(),
            font_size: FontSize::Medium,
            layout: LayoutConfig::default(),
        }
    }
}

impl EyeReadConfig {
    pub fn dwell_threshold(&self) -> Duration {
        Duration::from_millis(self.dwell_threshold_ms)
    }

    pub fn definition_display(&self) -> Duration {
        Duration::from_millis(self.definition_display_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dwell_threshold_ms == 0 {
            bail!("dwell_threshold_ms must be greater than zero");
        }
        if self.definition_display_ms == 0 {
            bail!("definition_display_ms must be greater than zero");
        }
        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            bail!(
                "viewport must have a positive size, got {}x{}",
                self.viewport.width,
                self.viewport.height
            );
        }
        if !(self.layout.width > 0.0) {
            bail!("layout width must be positive, got {}", self.layout.width);
        }
        Ok(())
    }
}

/// JSON-backed config file. A missing file yields defaults; an unreadable
/// one is an error, an unparsable one falls back to defaults.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<EyeReadConfig>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("Ignoring unparsable config {}: {err}", path.display());
                EyeReadConfig::default()
            })
        } else {
            EyeReadConfig::default()
        };

        data.validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> EyeReadConfig {
        self.read().clone()
    }

    pub fn update(&self, config: EyeReadConfig) -> Result<()> {
        config.validate()?;
        let mut guard = self.write();
        self.persist(&config)?;
        *guard = config;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {}", self.path.display()))?;
        let data: EyeReadConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config in {}", self.path.display()))?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &EyeReadConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write config to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, EyeReadConfig> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EyeReadConfig> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
