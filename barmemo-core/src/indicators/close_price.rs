//! Close price of the bar at an index.

use crate::error::{IndicatorError, IndicatorResult};
use crate::indicator::{CachedBase, CachedIndicator};
use crate::series::SeriesRef;

#[derive(Debug)]
pub struct ClosePrice {
    base: CachedBase<f64>,
}

impl ClosePrice {
    pub fn new(series: SeriesRef) -> Self {
        Self {
            base: CachedBase::new("close", series),
        }
    }
}

impl CachedIndicator for ClosePrice {
    type Output = f64;

    fn base(&self) -> &CachedBase<f64> {
        &self.base
    }

    fn calculate(&self, index: usize) -> IndicatorResult<f64> {
        self.base
            .series()
            .and_then(|series| series.bar(index))
            .map(|bar| bar.close)
            .ok_or(IndicatorError::BarUnavailable(index))
    }
}
