//! TOML configuration: series retention, cache strategy and the indicator
//! periods the replay tool queries.
//!
//! ```toml
//! [series]
//! name = "BTC-USD"
//! maximum_bar_count = 500
//!
//! [cache]
//! strategy = "native"
//!
//! [indicators]
//! sma_period = 20
//! ema_period = 10
//! ```
//!
//! Every section and key is optional.

use crate::cache::CacheConfig;
use crate::error::SeriesError;
use crate::series::BaseBarSeries;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub name: String,

    /// Absent means the series keeps every bar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_bar_count: Option<usize>,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            name: "series".to_string(),
            maximum_bar_count: None,
        }
    }
}

impl SeriesConfig {
    /// Empty series with this name and retention limit.
    pub fn build(&self) -> Result<BaseBarSeries, SeriesError> {
        match self.maximum_bar_count {
            Some(maximum) => BaseBarSeries::with_maximum_bar_count(&self.name, maximum),
            None => Ok(BaseBarSeries::new(&self.name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorsConfig {
    pub sma_period: usize,
    pub ema_period: usize,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self {
            sma_period: 20,
            ema_period: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarMemoConfig {
    pub series: SeriesConfig,
    pub cache: CacheConfig,
    pub indicators: IndicatorsConfig,
}

impl BarMemoConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.series.name.trim().is_empty() {
            return Err(ConfigError::Invalid("series.name must not be empty".into()));
        }
        if self.series.maximum_bar_count == Some(0) {
            return Err(ConfigError::Invalid(
                "series.maximum_bar_count must be greater than zero".into(),
            ));
        }
        if self.cache.maximum_size == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.maximum_size must be greater than zero".into(),
            ));
        }
        if self.indicators.sma_period == 0 || self.indicators.ema_period == 0 {
            return Err(ConfigError::Invalid(
                "indicator periods must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Empty series carrying the configured cache strategy.
    pub fn build_series(&self) -> Result<BaseBarSeries, SeriesError> {
        Ok(self.series.build()?.with_cache_config(self.cache.clone()))
    }
}
