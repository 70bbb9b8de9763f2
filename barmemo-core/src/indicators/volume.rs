//! Traded volume of the bar at an index. Not cached: reading a bar is as
//! cheap as reading a cache slot.

use crate::error::{IndicatorError, IndicatorResult};
use crate::indicator::Indicator;
use crate::series::SeriesRef;

#[derive(Clone)]
pub struct Volume {
    series: SeriesRef,
}

impl Volume {
    pub fn new(series: SeriesRef) -> Self {
        Self { series }
    }
}

impl Indicator for Volume {
    type Output = f64;

    fn name(&self) -> &str {
        "volume"
    }

    fn series(&self) -> Option<&SeriesRef> {
        Some(&self.series)
    }

    fn value(&self, index: usize) -> IndicatorResult<f64> {
        self.series
            .bar(index)
            .map(|bar| bar.volume as f64)
            .ok_or(IndicatorError::BarUnavailable(index))
    }
}
