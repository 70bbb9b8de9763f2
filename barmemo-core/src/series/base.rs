//! In-memory bar series with an optional retention limit.
//!
//! Bars are appended in end-time order. Once more than `maximum_bar_count`
//! bars are held, the oldest are dropped and `removed_bars_count` grows, so the
//! valid logical index range `[removed, removed + len - 1]` slides forward.
//! The last bar is the open bar and may be mutated in place.

use super::{BarSeries, UNBOUNDED};
use crate::cache::CacheConfig;
use crate::domain::Bar;
use crate::error::SeriesError;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

#[derive(Debug)]
struct SeriesState {
    bars: VecDeque<Bar>,
    removed: usize,
    maximum: usize,
}

impl SeriesState {
    fn end_index(&self) -> Option<usize> {
        (!self.bars.is_empty()).then(|| self.removed + self.bars.len() - 1)
    }

    /// Drop bars from the front until the retention limit holds.
    fn remove_exceeding_bars(&mut self) -> usize {
        let excess = self.bars.len().saturating_sub(self.maximum);
        if excess > 0 {
            self.bars.drain(..excess);
            self.removed += excess;
        }
        excess
    }
}

#[derive(Debug)]
pub struct BaseBarSeries {
    name: String,
    cache_config: CacheConfig,
    state: RwLock<SeriesState>,
}

impl BaseBarSeries {
    /// Unbounded series.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache_config: CacheConfig::default(),
            state: RwLock::new(SeriesState {
                bars: VecDeque::new(),
                removed: 0,
                maximum: UNBOUNDED,
            }),
        }
    }

    /// Series that retains at most `maximum` bars.
    pub fn with_maximum_bar_count(
        name: impl Into<String>,
        maximum: usize,
    ) -> Result<Self, SeriesError> {
        let series = Self::new(name);
        series.set_maximum_bar_count(maximum)?;
        Ok(series)
    }

    /// Cache strategy handed to indicators built on this series.
    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.cache_config = cache_config;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, SeriesState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SeriesState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the retention limit, evicting immediately if it shrank.
    pub fn set_maximum_bar_count(&self, maximum: usize) -> Result<(), SeriesError> {
        if maximum == 0 {
            return Err(SeriesError::ZeroMaximumBarCount);
        }
        let mut state = self.write();
        state.maximum = maximum;
        let removed = state.remove_exceeding_bars();
        if removed > 0 {
            debug!(series = %self.name, removed, maximum, "retention limit lowered");
        }
        Ok(())
    }

    /// Append a bar. It must end strictly after the current last bar.
    pub fn add_bar(&self, bar: Bar) -> Result<(), SeriesError> {
        let mut state = self.write();
        if let Some(last) = state.bars.back() {
            if bar.end_time <= last.end_time {
                return Err(SeriesError::OutOfOrder {
                    last: last.end_time,
                    new: bar.end_time,
                });
            }
        }
        state.bars.push_back(bar);
        let removed = state.remove_exceeding_bars();
        if removed > 0 {
            trace!(
                series = %self.name,
                removed_total = state.removed,
                "evicted oldest bar"
            );
        }
        Ok(())
    }

    /// Replace the open bar, e.g. with its final state once it closes.
    pub fn replace_last_bar(&self, bar: Bar) -> Result<(), SeriesError> {
        let mut state = self.write();
        let len = state.bars.len();
        if len == 0 {
            return Err(SeriesError::Empty(self.name.clone()));
        }
        if len > 1 {
            let previous = &state.bars[len - 2];
            if bar.end_time <= previous.end_time {
                return Err(SeriesError::OutOfOrder {
                    last: previous.end_time,
                    new: bar.end_time,
                });
            }
        }
        state.bars[len - 1] = bar;
        Ok(())
    }

    /// Update the close of the open bar.
    pub fn add_price(&self, price: f64) -> Result<(), SeriesError> {
        self.with_last_bar(|bar| bar.add_price(price))
    }

    /// Record a trade on the open bar.
    pub fn add_trade(&self, volume: u64, price: f64) -> Result<(), SeriesError> {
        self.with_last_bar(|bar| bar.add_trade(volume, price))
    }

    fn with_last_bar(&self, update: impl FnOnce(&mut Bar)) -> Result<(), SeriesError> {
        let mut state = self.write();
        match state.bars.back_mut() {
            Some(bar) => {
                update(bar);
                Ok(())
            }
            None => Err(SeriesError::Empty(self.name.clone())),
        }
    }

    pub fn first_bar(&self) -> Option<Bar> {
        self.read().bars.front().cloned()
    }

    pub fn last_bar(&self) -> Option<Bar> {
        self.read().bars.back().cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.read().bars.is_empty()
    }
}

impl BarSeries for BaseBarSeries {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_index(&self) -> Option<usize> {
        let state = self.read();
        (!state.bars.is_empty()).then_some(state.removed)
    }

    fn end_index(&self) -> Option<usize> {
        self.read().end_index()
    }

    fn removed_bars_count(&self) -> usize {
        self.read().removed
    }

    fn maximum_bar_count(&self) -> usize {
        self.read().maximum
    }

    /// An index before the begin index resolves to the first retained bar.
    fn bar(&self, index: usize) -> Option<Bar> {
        let state = self.read();
        let end = state.end_index()?;
        if index > end {
            return None;
        }
        if index < state.removed {
            trace!(
                series = %self.name,
                index,
                begin = state.removed,
                "bar already removed, using first retained bar"
            );
            return state.bars.front().cloned();
        }
        state.bars.get(index - state.removed).cloned()
    }

    fn bar_count(&self) -> usize {
        self.read().bars.len()
    }

    fn cache_config(&self) -> CacheConfig {
        self.cache_config.clone()
    }
}
