//! Engine tuning knobs, loadable from TOML.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::constants::{
    DEFAULT_DEAD_ZONE, DEFAULT_EDGE_BAND_RATIO, DEFAULT_HISTORY_LIMIT, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_RECALC_ATTEMPTS, DEFAULT_MIN_AREA_SIZE, DEFAULT_MIN_FRACTION,
    DEFAULT_RESIZE_DEBOUNCE_MS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub min_area_size: u16,
    pub min_fraction: f64,
    pub dead_zone: u16,
    pub edge_band_ratio: f64,
    pub resize_debounce_ms: u64,
    pub history_limit: usize,
    pub max_recalc_attempts: u8,
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_area_size: DEFAULT_MIN_AREA_SIZE,
            min_fraction: DEFAULT_MIN_FRACTION,
            dead_zone: DEFAULT_DEAD_ZONE,
            edge_band_ratio: DEFAULT_EDGE_BAND_RATIO,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_recalc_attempts: DEFAULT_MAX_RECALC_ATTEMPTS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: LayoutConfig = toml::from_str(source)?;
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Level the engine log records at; an unparsable value falls back to `warn`.
    pub fn log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::WARN)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.min_area_size == 0 {
            issues.push("min_area_size must be at least 1".to_string());
        }
        if !self.min_fraction.is_finite() || !(0.0..0.5).contains(&self.min_fraction) {
            issues.push(format!(
                "min_fraction ({}) must be in [0, 0.5)",
                self.min_fraction
            ));
        }
        if !self.edge_band_ratio.is_finite() || !(0.0..=0.5).contains(&self.edge_band_ratio) {
            issues.push(format!(
                "edge_band_ratio ({}) must be in [0, 0.5]",
                self.edge_band_ratio
            ));
        }
        if self.history_limit == 0 {
            issues.push("history_limit must be at least 1".to_string());
        }
        if self.max_recalc_attempts == 0 {
            issues.push("max_recalc_attempts must be at least 1".to_string());
        }
        if Level::from_str(&self.log_level).is_err() {
            issues.push(format!("log_level ({}) is not a tracing level", self.log_level));
        }
        issues
    }
}
