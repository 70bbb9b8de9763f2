//! Indicator traits.
//!
//! Indicators are pure functions of a bar index: the same index over the same
//! closed bars always yields the same value. Most indicators are cached:
//! they implement `CachedIndicator` (a `calculate` function plus a
//! `CachedBase`) and get `Indicator` through the blanket implementation below,
//! so the open-bar and below-range rules live in one place.

pub mod cached;

pub use cached::{CachedBase, CachedIndicator};

use crate::error::IndicatorResult;
use crate::series::SeriesRef;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    type Output;

    /// Human-readable name (e.g., "sma_20", "close").
    fn name(&self) -> &str;

    /// Series this indicator reads from, if any.
    fn series(&self) -> Option<&SeriesRef>;

    fn value(&self, index: usize) -> IndicatorResult<Self::Output>;
}

impl<I: CachedIndicator> Indicator for I {
    type Output = I::Output;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn series(&self) -> Option<&SeriesRef> {
        self.base().series()
    }

    fn value(&self, index: usize) -> IndicatorResult<Self::Output> {
        self.base().value(index, |i| self.calculate(i))
    }
}
