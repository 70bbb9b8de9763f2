//! BarMemo Core: memoized indicator values over bounded bar series.
//!
//! This crate contains:
//! - Bars and the `BarSeries` access port, with an in-memory implementation
//! - Indicator value caches: the sliding-window native cache, a map cache
//!   validated by bar identity, and a passthrough cache
//! - The cached indicator base and a few concrete indicators
//! - TOML configuration
//!
//! Values of closed bars are computed once and reused; the open (last) bar is
//! always recomputed.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod indicator;
pub mod indicators;
pub mod series;

pub use cache::{CacheConfig, CacheKey, CacheStrategy, IndicatorValueCache};
pub use config::{BarMemoConfig, ConfigError};
pub use domain::{Bar, BarKey};
pub use error::{IndicatorError, IndicatorResult, SeriesError};
pub use indicator::{CachedBase, CachedIndicator, Indicator};
pub use series::{BarSeries, BaseBarSeries, SeriesRef, UNBOUNDED};
