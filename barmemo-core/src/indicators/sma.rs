//! Simple Moving Average (SMA).
//!
//! Mean of the inner indicator over the last `period` indices. Near the start
//! of the series the window is shortened to `index + 1` values.
//! Lookback: period - 1.

use crate::error::IndicatorResult;
use crate::indicator::{CachedBase, CachedIndicator, Indicator};
use std::sync::Arc;

#[derive(Debug)]
pub struct Sma<I> {
    inner: Arc<I>,
    period: usize,
    base: CachedBase<f64>,
}

impl<I: Indicator<Output = f64>> Sma<I> {
    pub fn new(inner: Arc<I>, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        let base = CachedBase::from_indicator(format!("sma_{period}"), inner.as_ref());
        Self {
            inner,
            period,
            base,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }
}

impl<I: Indicator<Output = f64>> CachedIndicator for Sma<I> {
    type Output = f64;

    fn base(&self) -> &CachedBase<f64> {
        &self.base
    }

    fn calculate(&self, index: usize) -> IndicatorResult<f64> {
        let start = (index + 1).saturating_sub(self.period);
        let mut sum = 0.0;
        for i in start..=index {
            sum += self.inner.value(i)?;
        }
        Ok(sum / (index + 1 - start) as f64)
    }
}
