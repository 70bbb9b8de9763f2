//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = EMA[t-1] + alpha * (x[t] - EMA[t-1]), alpha = 2 / (period + 1)
//! Seed: EMA[0] = x[0].
//!
//! Each value is computed from the cached previous one. A cold query far above
//! the highest cached index first fills the gap in ascending order, so the
//! recursion stays shallow. Without a cache the value is folded forward from
//! the first retained bar instead of recursing.

use crate::error::IndicatorResult;
use crate::indicator::{CachedBase, CachedIndicator, Indicator};
use std::sync::Arc;
use tracing::debug;

/// Gap above the highest cached index that triggers ascending priming.
const PRIMING_THRESHOLD: usize = 100;

#[derive(Debug)]
pub struct Ema<I> {
    inner: Arc<I>,
    period: usize,
    alpha: f64,
    base: CachedBase<f64>,
}

impl<I: Indicator<Output = f64>> Ema<I> {
    pub fn new(inner: Arc<I>, period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        let base = CachedBase::from_indicator(format!("ema_{period}"), inner.as_ref());
        Self {
            inner,
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            base,
        }
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn prime(&self, index: usize) -> IndicatorResult<()> {
        let begin = self
            .base
            .series()
            .and_then(|series| series.begin_index())
            .unwrap_or(0);
        let from = self
            .base
            .cache()
            .highest_stored_index()
            .map_or(begin, |highest| highest.max(begin));
        if index > from + PRIMING_THRESHOLD {
            debug!(indicator = %self.base.name(), from, to = index, "priming cache");
            for i in from..index {
                self.value(i)?;
            }
        }
        Ok(())
    }

    /// Uncached EMA for `index >= 1`: seeded with `x[0]`, which stands in for
    /// every index before the series begin, then folded up to `index`.
    fn calculate_forward(&self, index: usize) -> IndicatorResult<f64> {
        let begin = self
            .base
            .series()
            .and_then(|series| series.begin_index())
            .unwrap_or(0);
        let mut ema = self.inner.value(0)?;
        for i in begin.clamp(1, index)..=index {
            ema += self.alpha * (self.inner.value(i)? - ema);
        }
        Ok(ema)
    }
}

impl<I: Indicator<Output = f64>> CachedIndicator for Ema<I> {
    type Output = f64;

    fn base(&self) -> &CachedBase<f64> {
        &self.base
    }

    fn calculate(&self, index: usize) -> IndicatorResult<f64> {
        if index == 0 {
            return self.inner.value(0);
        }
        if !self.base.stores_values() {
            return self.calculate_forward(index);
        }
        let current = self.inner.value(index)?;
        self.prime(index - 1)?;
        let previous = self.value(index - 1)?;
        Ok(previous + self.alpha * (current - previous))
    }
}
