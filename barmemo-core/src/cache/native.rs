//! Sliding-window result cache.
//!
//! Results live in a deque of optional values covering the logical window
//! `[highest - len + 1, highest]`, where `highest` is the greatest index ever
//! stored. The window grows by appending unresolved slots and never holds more
//! than the series' maximum bar count.
//!
//! ```text
//!   results = [r3, None, r5, r6]      highest = 6, len = 4
//!   slot(index) = len - 1 - (highest - index)
//!   slot(5) = 2,  slot(3) = 0,  slot(2) -> underflow
//! ```
//!
//! Query rules, given the series' removed count R and end index E:
//! - no series, empty series, `index >= E`: compute, never store
//! - `index < R`: collapse onto the lowest slot (one shared placeholder)
//! - otherwise: grow if needed, then return or fill the index's slot

use super::policy::below_range_substitute;
use super::{computed, CacheKey, IndicatorValueCache};
use crate::error::{IndicatorError, IndicatorResult};
use crate::series::BarSeries;
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Debug;
use std::iter;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

const STRATEGY: &str = "native";

#[derive(Debug)]
struct ResultWindow<T> {
    results: VecDeque<Option<T>>,
    highest_result_index: Option<usize>,
    /// Raised only once a computed value lands in a slot.
    highest_stored_index: Option<usize>,
}

impl<T> ResultWindow<T> {
    /// Make room for `index` at the high end of the window.
    ///
    /// Growing by `maximum` or more slots would push every current slot out,
    /// so the window is replaced with `maximum` fresh slots instead.
    fn increase_length_to(&mut self, index: usize, maximum: usize) {
        match self.highest_result_index {
            Some(highest) => {
                if index <= highest {
                    return;
                }
                let new_results = (index - highest).min(maximum);
                if new_results == maximum {
                    debug!(index, highest, maximum, "result window reset");
                    self.results.clear();
                    self.results.resize_with(maximum, || None);
                } else {
                    self.results
                        .extend(iter::repeat_with(|| None).take(new_results));
                    self.remove_exceeding_results(maximum);
                }
            }
            None => {
                debug_assert!(self.results.is_empty(), "first use of a non-empty window");
                let length = index.saturating_add(1).min(maximum);
                self.results.resize_with(length, || None);
            }
        }
    }

    fn remove_exceeding_results(&mut self, maximum: usize) {
        let excess = self.results.len().saturating_sub(maximum);
        if excess > 0 {
            self.results.drain(..excess);
            trace!(excess, maximum, "evicted oldest results");
        }
    }

    fn raise_highest(&mut self, index: usize) {
        let highest = self.highest_result_index.map_or(index, |h| h.max(index));
        self.highest_result_index = Some(highest);
    }

    /// Logical index held by the lowest slot.
    fn front_index(&self) -> Option<usize> {
        let highest = self.highest_result_index?;
        (highest + 1).checked_sub(self.results.len())
    }

    /// Physical slot of a logical index, `None` if it lies outside the window.
    fn slot(&self, index: usize) -> Option<usize> {
        let highest = self.highest_result_index?;
        let offset = highest.checked_sub(index)?;
        self.results.len().checked_sub(offset + 1)
    }

    /// Store a computed value, re-translating the slot: the window may have
    /// moved while the lock was released.
    fn store(&mut self, index: usize, value: T) {
        match self.slot(index) {
            Some(slot) => {
                self.results[slot] = Some(value);
                self.highest_stored_index = self.highest_stored_index.max(Some(index));
            }
            None => debug!(index, "slot evicted during computation, result not stored"),
        }
    }
}

/// Removed count, end index and limit read once per query and checked.
struct Bounds {
    removed: usize,
    end: Option<usize>,
    maximum: usize,
}

impl Bounds {
    fn read(series: &dyn BarSeries) -> IndicatorResult<Self> {
        let bounds = Self {
            removed: series.removed_bars_count(),
            end: series.end_index(),
            maximum: series.maximum_bar_count(),
        };
        if bounds.maximum == 0 {
            return Err(IndicatorError::ZeroMaximumBarCount);
        }
        if let Some(end) = bounds.end {
            if bounds.removed > end {
                return Err(IndicatorError::MalformedSeries {
                    removed: bounds.removed,
                    end,
                });
            }
        }
        Ok(bounds)
    }
}

/// Sliding-window cache following the series' retention limit.
#[derive(Debug)]
pub struct NativeIndicatorValueCache<T> {
    window: Mutex<ResultWindow<T>>,
}

impl<T> NativeIndicatorValueCache<T> {
    /// Empty window. Its size follows the series, so nothing is preallocated.
    pub fn new() -> Self {
        Self {
            window: Mutex::new(ResultWindow {
                results: VecDeque::new(),
                highest_result_index: None,
                highest_stored_index: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResultWindow<T>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Greatest logical index ever stored. Never decreases.
    pub fn highest_result_index(&self) -> Option<usize> {
        self.lock().highest_result_index
    }

    /// Number of slots, resolved or not.
    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().results.is_empty()
    }
}

impl<T> Default for NativeIndicatorValueCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Debug + Send> NativeIndicatorValueCache<T> {
    /// `index` was evicted from the series: every such query shares the value
    /// in the lowest slot.
    fn get_removed(
        &self,
        index: usize,
        bounds: &Bounds,
        compute: &dyn Fn(usize) -> IndicatorResult<T>,
    ) -> IndicatorResult<T> {
        let front_index = {
            let mut window = self.lock();
            window.increase_length_to(bounds.removed, bounds.maximum);
            // The series limit may have been lowered since the last query.
            window.remove_exceeding_results(bounds.maximum);
            window.raise_highest(bounds.removed);
            if let Some(Some(value)) = window.results.front() {
                return Ok(value.clone());
            }
            window.front_index()
        };

        let substitute = below_range_substitute(index);
        trace!(
            index,
            removed = bounds.removed,
            substitute,
            "result already removed from cache, computing placeholder"
        );
        let value = computed(STRATEGY, substitute, compute)?;

        let mut window = self.lock();
        let slot = front_index.and_then(|front| window.slot(front));
        match slot {
            Some(slot) => {
                let entry = &mut window.results[slot];
                if entry.is_none() {
                    *entry = Some(value.clone());
                }
            }
            None => debug!(index, "placeholder slot evicted during computation, not stored"),
        }
        Ok(value)
    }

    fn get_retained(
        &self,
        index: usize,
        maximum: usize,
        compute: &dyn Fn(usize) -> IndicatorResult<T>,
    ) -> IndicatorResult<T> {
        {
            let mut window = self.lock();
            window.increase_length_to(index, maximum);
            window.remove_exceeding_results(maximum);
            let highest_result_index = window.highest_result_index;
            match highest_result_index {
                Some(highest) if index <= highest => {
                    let slot = window.slot(index).ok_or(IndicatorError::SlotUnderflow {
                        index,
                        highest,
                        len: window.results.len(),
                    })?;
                    if let Some(value) = &window.results[slot] {
                        return Ok(value.clone());
                    }
                }
                _ => window.highest_result_index = Some(index),
            }
        }

        // Lock released: compute may re-enter this cache.
        let value = computed(STRATEGY, index, compute)?;
        self.lock().store(index, value.clone());
        Ok(value)
    }
}

impl<T: Clone + Debug + Send> IndicatorValueCache<T> for NativeIndicatorValueCache<T> {
    fn get(
        &self,
        key: &CacheKey<'_>,
        compute: &dyn Fn(usize) -> IndicatorResult<T>,
    ) -> IndicatorResult<T> {
        let index = key.index();
        let Some(series) = key.series() else {
            return computed(STRATEGY, index, compute);
        };
        let bounds = Bounds::read(series)?;
        let Some(end) = bounds.end else {
            return computed(STRATEGY, index, compute);
        };

        if index < bounds.removed {
            self.get_removed(index, &bounds, compute)
        } else if index >= end {
            // Open bar: its value is not settled yet.
            computed(STRATEGY, index, compute)
        } else {
            self.get_retained(index, bounds.maximum, compute)
        }
    }

    fn put(&self, _key: &CacheKey<'_>, _value: T) -> IndicatorResult<()> {
        Err(IndicatorError::UnsupportedPut(STRATEGY))
    }

    fn snapshot(&self) -> BTreeMap<usize, T> {
        let window = self.lock();
        let Some(highest) = window.highest_result_index else {
            return BTreeMap::new();
        };
        let first = highest + 1 - window.results.len();
        window
            .results
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| Some((first + slot, value.clone()?)))
            .collect()
    }

    /// The window manages itself; closed bars never change.
    fn clear(&self) {}

    fn highest_stored_index(&self) -> Option<usize> {
        self.lock().highest_stored_index
    }
}
