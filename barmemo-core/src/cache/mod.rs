//! Indicator value caches.
//!
//! An `IndicatorValueCache` memoizes one indicator's values by logical bar
//! index. Values only enter through `get`, which either returns a stored value
//! or runs the supplied compute function. Three strategies are available:
//!
//! - `NativeIndicatorValueCache`: sliding window that follows the series'
//!   retention limit (the default)
//! - `MapIndicatorValueCache`: ordered map validated against bar identity
//! - `PassthroughCache`: never stores anything
//!
//! The open bar (the series' end index) is never cached by any strategy.

pub mod config;
pub mod map;
pub mod native;
pub mod passthrough;
pub mod policy;

pub use config::{CacheConfig, CacheStrategy};
pub use map::MapIndicatorValueCache;
pub use native::NativeIndicatorValueCache;
pub use passthrough::PassthroughCache;

use crate::domain::BarKey;
use crate::error::IndicatorResult;
use crate::series::BarSeries;
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Memoization strategy for a single indicator.
///
/// `compute` must be pure: the cache may call it zero or more times for an
/// index and keeps at most one result per index. It may re-enter the owning
/// indicator at lower indices; implementations must not hold internal locks
/// while it runs.
pub trait IndicatorValueCache<T>: Send + Sync {
    fn get(
        &self,
        key: &CacheKey<'_>,
        compute: &dyn Fn(usize) -> IndicatorResult<T>,
    ) -> IndicatorResult<T>;

    /// Store a value directly. Strategies that derive their layout from the
    /// compute path reject this.
    fn put(&self, key: &CacheKey<'_>, value: T) -> IndicatorResult<()>;

    /// Resolved entries keyed by logical index.
    fn snapshot(&self) -> BTreeMap<usize, T>;

    fn clear(&self);

    /// Greatest logical index a value was ever stored for, if tracked.
    fn highest_stored_index(&self) -> Option<usize> {
        None
    }

    /// Whether computed values are kept at all.
    fn stores_values(&self) -> bool {
        true
    }
}

/// Logical index plus the series it belongs to.
#[derive(Clone, Copy)]
pub struct CacheKey<'a> {
    index: usize,
    series: Option<&'a dyn BarSeries>,
}

impl<'a> CacheKey<'a> {
    pub fn new(index: usize, series: &'a dyn BarSeries) -> Self {
        Self {
            index,
            series: Some(series),
        }
    }

    /// Key with no series attached. Values for it are never stored.
    pub fn detached(index: usize) -> Self {
        Self {
            index,
            series: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn series(&self) -> Option<&'a dyn BarSeries> {
        self.series
    }

    /// Identity of the bar at this index, if the series has one.
    pub fn bar_key(&self) -> Option<BarKey> {
        self.series?.bar(self.index).map(|bar| bar.key())
    }
}

impl fmt::Debug for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("index", &self.index)
            .field("series", &self.series.map(|s| s.name()))
            .finish()
    }
}

/// Run `compute` and emit the per-value trace event.
pub(crate) fn computed<T: fmt::Debug>(
    strategy: &'static str,
    index: usize,
    compute: &dyn Fn(usize) -> IndicatorResult<T>,
) -> IndicatorResult<T> {
    let value = compute(index)?;
    trace!(strategy, index, value = ?value, "computed indicator value");
    Ok(value)
}
