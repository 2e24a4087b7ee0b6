use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{ColorMode, Configuration};
use crate::error::{Result, VizError};

/// Flat settings document. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredSettings {
    pub device: Option<String>,
    pub bars: usize,
    pub scale: f32,
    pub auto_scale: bool,
    pub color: ColorMode,
    pub decay_factor: f32,
    pub cap_decay_factor: f32,
    pub use_caps: bool,
    pub debug_output: bool,
    pub input_gain: f32,
    pub spectrum_gain: f32,
    pub min_bar_height: u32,
    pub max_bar_height_fraction: f32,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self::from_config(&Configuration::default(), None)
    }
}

impl StoredSettings {
    pub fn from_config(cfg: &Configuration, device: Option<String>) -> Self {
        Self {
            device,
            bars: cfg.bar_count,
            scale: cfg.scale,
            auto_scale: cfg.auto_scale,
            color: cfg.color_mode,
            decay_factor: cfg.decay_factor,
            cap_decay_factor: cfg.cap_decay_factor,
            use_caps: cfg.use_caps,
            debug_output: cfg.debug_output,
            input_gain: cfg.input_gain,
            spectrum_gain: cfg.spectrum_gain,
            min_bar_height: cfg.min_bar_height,
            max_bar_height_fraction: cfg.max_bar_height_fraction,
        }
    }

    pub fn to_config(&self) -> Configuration {
        Configuration {
            bar_count: self.bars,
            input_gain: self.input_gain,
            spectrum_gain: self.spectrum_gain,
            decay_factor: self.decay_factor,
            cap_decay_factor: self.cap_decay_factor,
            min_bar_height: self.min_bar_height,
            max_bar_height_fraction: self.max_bar_height_fraction,
            use_caps: self.use_caps,
            auto_scale: self.auto_scale,
            scale: self.scale,
            color_mode: self.color,
            debug_output: self.debug_output,
        }
    }
}

/// JSON file holding [`StoredSettings`].
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict load: I/O, parse and range errors are returned.
    pub fn load(&self) -> Result<StoredSettings> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| VizError::Store(format!("reading {}: {}", self.path.display(), e)))?;
        let settings: StoredSettings = serde_json::from_str(&text)
            .map_err(|e| VizError::Store(format!("parsing {}: {}", self.path.display(), e)))?;
        settings.to_config().validate()?;
        Ok(settings)
    }

    /// Soft load: any problem is logged and defaults are used instead.
    pub fn load_or_default(&self) -> StoredSettings {
        if !self.path.exists() {
            info!("{} not found, using defaults", self.path.display());
            return StoredSettings::default();
        }
        match self.load() {
            Ok(settings) => {
                info!("settings loaded from {}", self.path.display());
                settings
            }
            Err(e) => {
                warn!("{}; using defaults", e);
                StoredSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &StoredSettings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .map_err(|e| VizError::Store(format!("creating {}: {}", dir.display(), e)))?;
            }
        }
        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| VizError::Store(e.to_string()))?;
        fs::write(&self.path, text)
            .map_err(|e| VizError::Store(format!("writing {}: {}", self.path.display(), e)))?;
        info!("settings saved to {}", self.path.display());
        Ok(())
    }
}
