//! Series access port.
//!
//! Caches and indicators only see a series through `BarSeries`: the valid
//! logical index range, how many bars were evicted from the front, the
//! retention limit, and random access to bars. `BaseBarSeries` is the
//! in-memory implementation.

pub mod base;

pub use base::BaseBarSeries;

use crate::cache::CacheConfig;
use crate::domain::Bar;
use std::sync::Arc;

/// Sentinel for `maximum_bar_count` meaning "no limit".
pub const UNBOUNDED: usize = usize::MAX;

/// Shared, read-only handle to a series. Many indicators derive from one series.
pub type SeriesRef = Arc<dyn BarSeries>;

pub trait BarSeries: Send + Sync {
    fn name(&self) -> &str;

    /// Logical index of the first retained bar, `None` when the series is empty.
    fn begin_index(&self) -> Option<usize>;

    /// Logical index of the last (possibly still open) bar, `None` when empty.
    fn end_index(&self) -> Option<usize>;

    /// Number of bars evicted from the front of the series. Never decreases.
    fn removed_bars_count(&self) -> usize;

    /// Retention limit, `UNBOUNDED` when the series keeps every bar.
    fn maximum_bar_count(&self) -> usize;

    /// Bar at a logical index.
    fn bar(&self, index: usize) -> Option<Bar>;

    /// Number of bars currently retained.
    fn bar_count(&self) -> usize {
        match (self.begin_index(), self.end_index()) {
            (Some(begin), Some(end)) => end + 1 - begin,
            _ => 0,
        }
    }

    /// Cache strategy for indicators built on this series.
    fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
    }
}
