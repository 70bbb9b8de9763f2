//! Cache strategy selection.

use super::{IndicatorValueCache, MapIndicatorValueCache, NativeIndicatorValueCache, PassthroughCache};
use crate::series::UNBOUNDED;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Sliding window bounded by the series' maximum bar count.
    #[default]
    Native,
    /// Ordered map keyed by index, validated against bar identity.
    Map,
    /// No caching; every query recomputes.
    Disabled,
}

impl FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Self::Native),
            "map" => Ok(Self::Map),
            "disabled" => Ok(Self::Disabled),
            _ => Err(format!(
                "unknown cache strategy '{s}'. Valid: native, map, disabled"
            )),
        }
    }
}

/// Which cache an indicator gets, and how large it may grow.
///
/// A series carries one of these; every cached indicator built on the series
/// asks it for a fresh cache instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub strategy: CacheStrategy,

    /// Entry limit for the map strategy. The native window follows the
    /// series' maximum bar count instead. Absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_size: Option<usize>,
}

impl CacheConfig {
    pub fn new(strategy: CacheStrategy) -> Self {
        Self {
            strategy,
            maximum_size: None,
        }
    }

    pub fn with_maximum_size(mut self, maximum_size: usize) -> Self {
        self.maximum_size = Some(maximum_size);
        self
    }

    /// Effective limit, `UNBOUNDED` when none is configured.
    pub fn maximum_size(&self) -> usize {
        self.maximum_size.unwrap_or(UNBOUNDED)
    }

    /// Build an empty cache for values of type `T`.
    pub fn build<T>(&self) -> Box<dyn IndicatorValueCache<T>>
    where
        T: Clone + Debug + Send + 'static,
    {
        match self.strategy {
            CacheStrategy::Native => Box::new(NativeIndicatorValueCache::new()),
            CacheStrategy::Map => Box::new(MapIndicatorValueCache::new(self)),
            CacheStrategy::Disabled => Box::new(PassthroughCache::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::error::IndicatorError;

    #[test]
    fn default_is_unbounded_native() {
        let config = CacheConfig::default();
        assert_eq!(config.strategy, CacheStrategy::Native);
        assert_eq!(config.maximum_size(), UNBOUNDED);
    }

    #[test]
    fn parses_from_toml() {
        let config: CacheConfig = toml::from_str(
            r#"
strategy = "map"
maximum_size = 64
"#,
        )
        .unwrap();
        assert_eq!(config, CacheConfig::new(CacheStrategy::Map).with_maximum_size(64));

        let config: CacheConfig = toml::from_str("").unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn strategy_from_str() {
        assert_eq!("map".parse::<CacheStrategy>(), Ok(CacheStrategy::Map));
        assert_eq!("disabled".parse::<CacheStrategy>(), Ok(CacheStrategy::Disabled));
        assert!("lru".parse::<CacheStrategy>().is_err());
    }

    #[test]
    fn huge_maximum_size_builds_lazily() {
        for strategy in [CacheStrategy::Native, CacheStrategy::Map] {
            let cache = CacheConfig::new(strategy)
                .with_maximum_size(1 << 60)
                .build::<f64>();
            assert!(cache.snapshot().is_empty());
        }
    }

    #[test]
    fn build_selects_strategy() {
        // Only the native cache rejects direct writes.
        let key = CacheKey::detached(0);
        let native = CacheConfig::new(CacheStrategy::Native).build::<f64>();
        assert_eq!(
            native.put(&key, 1.0),
            Err(IndicatorError::UnsupportedPut("native"))
        );
        let map = CacheConfig::new(CacheStrategy::Map).build::<f64>();
        assert!(map.put(&key, 1.0).is_ok());
        let disabled = CacheConfig::new(CacheStrategy::Disabled).build::<f64>();
        assert!(disabled.put(&key, 1.0).is_ok());
        assert!(disabled.snapshot().is_empty());
    }
}
