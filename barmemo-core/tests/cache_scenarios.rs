//! End-to-end cache behavior over a real bounded series.
//!
//! Covers the reference scenarios:
//! 1. Retained closed index is computed once
//! 2. Evicted indices collapse onto one placeholder computed for index 0
//! 3. The open bar is recomputed on every query
//! 4. Unbounded sequential fill computes each index exactly once

use barmemo_core::cache::{CacheKey, IndicatorValueCache, NativeIndicatorValueCache};
use barmemo_core::domain::Bar;
use barmemo_core::error::IndicatorResult;
use barmemo_core::series::{BarSeries, BaseBarSeries};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::Cell;
use std::collections::BTreeMap;

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn minute_bar(i: usize) -> Bar {
    Bar::flat(start() + Duration::minutes(i as i64 + 1), 100.0 + i as f64)
}

/// Series with bars 0..count, keeping at most `maximum`.
fn series_with(count: usize, maximum: Option<usize>) -> BaseBarSeries {
    let series = match maximum {
        Some(m) => BaseBarSeries::with_maximum_bar_count("SCENARIO", m).unwrap(),
        None => BaseBarSeries::new("SCENARIO"),
    };
    for i in 0..count {
        series.add_bar(minute_bar(i)).unwrap();
    }
    series
}

/// Compute function that counts its invocations per index.
struct Counter {
    calls: Cell<BTreeMap<usize, usize>>,
}

impl Counter {
    fn new() -> Self {
        Self {
            calls: Cell::new(BTreeMap::new()),
        }
    }

    fn compute(&self, index: usize) -> IndicatorResult<f64> {
        let mut calls = self.calls.take();
        *calls.entry(index).or_default() += 1;
        self.calls.set(calls);
        Ok(index as f64 * 10.0 + 1.0)
    }

    fn calls(&self, index: usize) -> usize {
        let calls = self.calls.take();
        let n = calls.get(&index).copied().unwrap_or(0);
        self.calls.set(calls);
        n
    }

    fn total(&self) -> usize {
        let calls = self.calls.take();
        let n = calls.values().sum();
        self.calls.set(calls);
        n
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn scenario_1_retained_index_computed_once() {
    let series = series_with(10, Some(5));
    assert_eq!(series.removed_bars_count(), 5);
    assert_eq!(series.end_index(), Some(9));

    let cache = NativeIndicatorValueCache::<f64>::default();
    let counter = Counter::new();
    let f = |i| counter.compute(i);

    assert_eq!(cache.get(&CacheKey::new(5, &series), &f), Ok(51.0));
    assert_eq!(cache.get(&CacheKey::new(5, &series), &f), Ok(51.0));
    assert_eq!(counter.calls(5), 1);
    assert!(cache.len() <= 5);
}

#[test]
fn scenario_2_evicted_indices_share_placeholder() {
    let series = series_with(10, Some(5));
    let cache = NativeIndicatorValueCache::<f64>::default();
    let counter = Counter::new();
    let f = |i| counter.compute(i);

    let placeholder = cache.get(&CacheKey::new(3, &series), &f).unwrap();
    assert_eq!(placeholder, 1.0);
    assert_eq!(counter.calls(0), 1);
    assert_eq!(counter.calls(3), 0);

    assert_eq!(cache.get(&CacheKey::new(2, &series), &f), Ok(placeholder));
    assert_eq!(cache.get(&CacheKey::new(0, &series), &f), Ok(placeholder));
    assert_eq!(counter.total(), 1);
}

#[test]
fn scenario_3_open_bar_always_recomputed() {
    let series = series_with(10, Some(5));
    let cache = NativeIndicatorValueCache::<f64>::default();
    let state = Cell::new(0.0);
    let f = |_: usize| -> IndicatorResult<f64> {
        state.set(state.get() + 1.0);
        Ok(state.get())
    };

    assert_eq!(cache.get(&CacheKey::new(9, &series), &f), Ok(1.0));
    assert_eq!(cache.get(&CacheKey::new(9, &series), &f), Ok(2.0));
    assert!(cache.snapshot().is_empty());
}

#[test]
fn scenario_4_unbounded_sequential_fill() {
    let series = series_with(1001, None);
    let cache = NativeIndicatorValueCache::<f64>::default();
    let counter = Counter::new();
    let f = |i| counter.compute(i);

    for i in 0..1000 {
        cache.get(&CacheKey::new(i, &series), &f).unwrap();
    }
    assert_eq!(cache.len(), 1000);
    assert_eq!(counter.total(), 1000);

    for i in (0..1000).rev() {
        assert_eq!(cache.get(&CacheKey::new(i, &series), &f), Ok(i as f64 * 10.0 + 1.0));
    }
    assert_eq!(counter.total(), 1000);
    assert!((0..1000).all(|i| counter.calls(i) == 1));
}

// ── Streaming ────────────────────────────────────────────────────────

#[test]
fn eviction_keeps_oldest_retained_value_exact() {
    let series = series_with(0, Some(4));
    let cache = NativeIndicatorValueCache::<f64>::default();
    let counter = Counter::new();
    let f = |i| counter.compute(i);

    for i in 0..20 {
        series.add_bar(minute_bar(i)).unwrap();
        let end = series.end_index().unwrap();
        if end > 0 {
            cache.get(&CacheKey::new(end - 1, &series), &f).unwrap();
        }
        assert!(cache.len() <= 4);
    }

    let begin = series.begin_index().unwrap();
    assert_eq!(begin, 16);
    assert_eq!(
        cache.get(&CacheKey::new(begin, &series), &f),
        Ok(begin as f64 * 10.0 + 1.0)
    );
    assert_eq!(counter.calls(begin), 1);
}

#[test]
fn open_bar_becomes_cacheable_once_closed() {
    let series = series_with(3, Some(10));
    let cache = NativeIndicatorValueCache::<f64>::default();
    let counter = Counter::new();
    let f = |i| counter.compute(i);

    cache.get(&CacheKey::new(2, &series), &f).unwrap();
    cache.get(&CacheKey::new(2, &series), &f).unwrap();
    assert_eq!(counter.calls(2), 2);

    series.add_bar(minute_bar(3)).unwrap();
    cache.get(&CacheKey::new(2, &series), &f).unwrap();
    cache.get(&CacheKey::new(2, &series), &f).unwrap();
    assert_eq!(counter.calls(2), 3);
    assert_eq!(cache.snapshot().get(&2), Some(&21.0));
}

#[test]
fn high_water_mark_survives_placeholder_queries() {
    let series = series_with(12, Some(6));
    let cache = NativeIndicatorValueCache::<f64>::default();
    let counter = Counter::new();
    let f = |i| counter.compute(i);

    cache.get(&CacheKey::new(10, &series), &f).unwrap();
    assert_eq!(cache.highest_result_index(), Some(10));
    cache.get(&CacheKey::new(1, &series), &f).unwrap();
    assert_eq!(cache.highest_result_index(), Some(10));
    cache.get(&CacheKey::new(10, &series), &f).unwrap();
    assert_eq!(counter.calls(10), 1);
}
