//! Analysis configuration.
//!
//! Holds the checkpoint list, survival offsets, eligibility age and the
//! segment thresholds. Every field has a default, so a partial file (or no
//! file at all) is valid.
//!
//! The default location is `~/.config/rbp-retention/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checkpoints::{Checkpoints, DayOffsets, DEFAULT_CHECKPOINT_MONTHS};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::segments::{DepthTier, DepthTiers, DEFAULT_EARLY_ACTIVATION_DAYS};
use crate::survival::DEFAULT_MIN_AGE_DAYS;

/// Application name used for the config directory path
const APP_NAME: &str = "rbp-retention";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub checkpoint_months: Vec<i64>,
    pub survival_offset_days: Vec<i64>,
    pub min_age_days: i64,
    pub early_activation_days: i64,
    pub depth_tiers: Vec<DepthTier>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            checkpoint_months: DEFAULT_CHECKPOINT_MONTHS.to_vec(),
            survival_offset_days: DayOffsets::default().values().to_vec(),
            min_age_days: DEFAULT_MIN_AGE_DAYS,
            early_activation_days: DEFAULT_EARLY_ACTIVATION_DAYS,
            depth_tiers: DepthTiers::default().tiers().to_vec(),
        }
    }
}

impl AnalysisConfig {
    /// Load from the default location, falling back to defaults if no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn checkpoints(&self) -> AnalyticsResult<Checkpoints> {
        Checkpoints::months(&self.checkpoint_months)
    }

    pub fn offsets(&self) -> AnalyticsResult<DayOffsets> {
        DayOffsets::new(self.survival_offset_days.clone())
    }

    pub fn depth_tiers(&self) -> AnalyticsResult<DepthTiers> {
        DepthTiers::new(self.depth_tiers.clone())
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        self.checkpoints()?;
        self.offsets()?;
        self.depth_tiers()?;
        if self.min_age_days < 0 {
            return Err(AnalyticsError::invalid(format!(
                "min_age_days must not be negative, got {}",
                self.min_age_days
            )));
        }
        if self.early_activation_days < 0 {
            return Err(AnalyticsError::invalid(format!(
                "early_activation_days must not be negative, got {}",
                self.early_activation_days
            )));
        }
        Ok(())
    }
}
