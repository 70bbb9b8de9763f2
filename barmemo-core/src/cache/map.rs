//! Map-backed cache keyed by logical index and validated by bar identity.
//!
//! Each entry remembers the key of the bar it was computed from. A lookup only
//! hits when the bar currently at that index still has the same key, so a
//! replaced bar is recomputed. When `maximum_size` is exceeded the lowest
//! index is evicted first.

use super::{computed, CacheConfig, CacheKey, IndicatorValueCache};
use crate::domain::BarKey;
use crate::error::IndicatorResult;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

const STRATEGY: &str = "map";

#[derive(Debug)]
pub struct MapIndicatorValueCache<T> {
    maximum_size: usize,
    entries: Mutex<BTreeMap<usize, (BarKey, T)>>,
}

impl<T> MapIndicatorValueCache<T> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            maximum_size: config.maximum_size(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<usize, (BarKey, T)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn insert(&self, index: usize, bar_key: BarKey, value: T) {
        let mut entries = self.lock();
        entries.insert(index, (bar_key, value));
        while entries.len() > self.maximum_size {
            if let Some((evicted, _)) = entries.pop_first() {
                trace!(evicted, maximum_size = self.maximum_size, "evicted oldest entry");
            }
        }
    }
}

/// Bar identity for a key that may be cached: a closed bar inside the
/// retained range of its series.
fn cacheable(key: &CacheKey<'_>) -> Option<BarKey> {
    let series = key.series()?;
    let index = key.index();
    let begin = series.begin_index()?;
    let end = series.end_index()?;
    if index < begin || index >= end {
        return None;
    }
    key.bar_key()
}

impl<T: Clone + Debug + Send> IndicatorValueCache<T> for MapIndicatorValueCache<T> {
    fn get(
        &self,
        key: &CacheKey<'_>,
        compute: &dyn Fn(usize) -> IndicatorResult<T>,
    ) -> IndicatorResult<T> {
        let index = key.index();
        let Some(bar_key) = cacheable(key) else {
            return computed(STRATEGY, index, compute);
        };

        if let Some((stored_key, value)) = self.lock().get(&index) {
            if *stored_key == bar_key {
                return Ok(value.clone());
            }
        }

        let value = computed(STRATEGY, index, compute)?;
        self.insert(index, bar_key, value.clone());
        Ok(value)
    }

    /// Writes for the open bar or outside the retained range are dropped.
    fn put(&self, key: &CacheKey<'_>, value: T) -> IndicatorResult<()> {
        match cacheable(key) {
            Some(bar_key) => self.insert(key.index(), bar_key, value),
            None => trace!(index = key.index(), "put ignored for uncacheable index"),
        }
        Ok(())
    }

    fn snapshot(&self) -> BTreeMap<usize, T> {
        self.lock()
            .iter()
            .map(|(index, (_, value))| (*index, value.clone()))
            .collect()
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn highest_stored_index(&self) -> Option<usize> {
        self.lock().last_key_value().map(|(index, _)| *index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStrategy;
    use crate::indicators::{make_bars, make_series};
    use crate::series::BarSeries;
    use std::cell::Cell;

    fn cache(limit: Option<usize>) -> MapIndicatorValueCache<f64> {
        let mut config = CacheConfig::new(CacheStrategy::Map);
        config.maximum_size = limit;
        MapIndicatorValueCache::new(&config)
    }

    #[test]
    fn closed_bars_are_cached_once() {
        let series = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let cache = cache(None);
        let calls = Cell::new(0);
        let compute = |i: usize| -> IndicatorResult<f64> {
            calls.set(calls.get() + 1);
            Ok(i as f64)
        };
        for _ in 0..3 {
            assert_eq!(cache.get(&CacheKey::new(2, series.as_ref()), &compute), Ok(2.0));
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.snapshot(), BTreeMap::from([(2, 2.0)]));
    }

    #[test]
    fn open_bar_is_not_cached() {
        let series = make_series(&[1.0, 2.0, 3.0]);
        let cache = cache(None);
        cache.get(&CacheKey::new(2, series.as_ref()), &|_| Ok(1.0)).unwrap();
        cache.put(&CacheKey::new(2, series.as_ref()), 5.0).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn replaced_bar_is_recomputed() {
        let series = make_series(&[1.0, 2.0, 3.0]);
        let cache = cache(None);
        cache.get(&CacheKey::new(0, series.as_ref()), &|_| Ok(1.0)).unwrap();

        // A different bar now sits at index 0 of a fresh series.
        let shifted = crate::series::BaseBarSeries::new("SHIFTED");
        for mut bar in make_bars(&[1.0, 2.0, 3.0]) {
            bar.end_time += chrono::Duration::hours(1);
            shifted.add_bar(bar).unwrap();
        }
        let value = cache
            .get(&CacheKey::new(0, &shifted as &dyn BarSeries), &|_| Ok(9.0))
            .unwrap();
        assert_eq!(value, 9.0);
    }

    #[test]
    fn oldest_entries_are_evicted_past_limit() {
        let series = make_series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let cache = cache(Some(2));
        for i in 0..5 {
            cache.get(&CacheKey::new(i, series.as_ref()), &|i| Ok(i as f64)).unwrap();
        }
        assert_eq!(cache.snapshot(), BTreeMap::from([(3, 3.0), (4, 4.0)]));
        assert_eq!(cache.highest_stored_index(), Some(4));
    }

    #[test]
    fn put_then_get_and_clear() {
        let series = make_series(&[1.0, 2.0, 3.0]);
        let cache = cache(None);
        let key = CacheKey::new(1, series.as_ref());
        cache.put(&key, 42.0).unwrap();
        assert_eq!(cache.get(&key, &|_| Ok(0.0)), Ok(42.0));
        cache.clear();
        assert_eq!(cache.get(&key, &|_| Ok(0.0)), Ok(0.0));
    }
}
