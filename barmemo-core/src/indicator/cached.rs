//! Cached indicator base.
//!
//! `CachedBase` owns an indicator's cache and decides, per index, whether a
//! value may be cached at all:
//! - no series, empty series, or the open bar (`index >= end`): compute directly
//! - before the series' begin index: compute the substitute index instead
//! - otherwise: ask the cache, with `calculate` as the fallback

use super::Indicator;
use crate::cache::policy::below_range_substitute;
use crate::cache::{CacheConfig, CacheKey, IndicatorValueCache};
use crate::error::IndicatorResult;
use crate::series::SeriesRef;
use std::fmt::{self, Debug};
use tracing::trace;

pub struct CachedBase<T> {
    name: String,
    series: Option<SeriesRef>,
    cache: Box<dyn IndicatorValueCache<T>>,
}

impl<T> CachedBase<T>
where
    T: Clone + Debug + Send + 'static,
{
    /// Base over a series, using the series' cache configuration.
    pub fn new(name: impl Into<String>, series: SeriesRef) -> Self {
        let cache = series.cache_config().build();
        Self::with_cache(name, Some(series), cache)
    }

    /// Base sharing the series of another indicator.
    pub fn from_indicator<I>(name: impl Into<String>, indicator: &I) -> Self
    where
        I: Indicator + ?Sized,
    {
        match indicator.series() {
            Some(series) => Self::new(name, series.clone()),
            None => Self::detached(name),
        }
    }

    /// Base with no series: every value is computed on demand.
    pub fn detached(name: impl Into<String>) -> Self {
        Self::with_cache(name, None, CacheConfig::default().build())
    }

    pub fn with_cache(
        name: impl Into<String>,
        series: Option<SeriesRef>,
        cache: Box<dyn IndicatorValueCache<T>>,
    ) -> Self {
        Self {
            name: name.into(),
            series,
            cache,
        }
    }

    pub fn value<F>(&self, index: usize, calculate: F) -> IndicatorResult<T>
    where
        F: Fn(usize) -> IndicatorResult<T>,
    {
        let Some(series) = self.series.as_deref() else {
            return calculate(index);
        };
        match series.end_index() {
            Some(end) if index < end => {}
            // Don't cache the open bar or a series without bars.
            _ => return calculate(index),
        }
        if series.begin_index().is_some_and(|begin| index < begin) {
            let substitute = below_range_substitute(index);
            trace!(indicator = %self.name, index, substitute, "index before series begin");
            return calculate(substitute);
        }
        self.cache.get(&CacheKey::new(index, series), &calculate)
    }
}

impl<T> CachedBase<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn series(&self) -> Option<&SeriesRef> {
        self.series.as_ref()
    }

    pub fn cache(&self) -> &dyn IndicatorValueCache<T> {
        self.cache.as_ref()
    }

    /// False when every `value` call recomputes.
    pub fn stores_values(&self) -> bool {
        self.series.is_some() && self.cache.stores_values()
    }
}

impl<T> Debug for CachedBase<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedBase")
            .field("name", &self.name)
            .field("series", &self.series.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}

/// An indicator whose values are memoized by a `CachedBase`.
///
/// Implementors provide `calculate`, a pure function of the index, and never
/// handle caching themselves. `calculate` may call `self.value(j)` for `j`
/// lower than the index being calculated.
pub trait CachedIndicator: Send + Sync {
    type Output: Clone + Debug + Send + 'static;

    fn base(&self) -> &CachedBase<Self::Output>;

    fn calculate(&self, index: usize) -> IndicatorResult<Self::Output>;
}
