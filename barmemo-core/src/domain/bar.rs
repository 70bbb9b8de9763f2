//! Bar: one observation in a bar series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar ending at `end_time`.
///
/// The last bar of a series may still be open: its close, high, low and volume
/// keep moving until the next bar is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub end_time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Opaque identity of a bar, used by map-based caches as a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BarKey(NaiveDateTime);

impl Bar {
    /// Bar with all four prices set to `price` and no volume.
    pub fn flat(end_time: NaiveDateTime, price: f64) -> Self {
        Self {
            end_time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0,
        }
    }

    pub fn key(&self) -> BarKey {
        BarKey(self.end_time)
    }

    /// Returns true if any price field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Move the close to `price`, widening high/low as needed.
    pub fn add_price(&mut self, price: f64) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
    }

    /// Record a trade on an open bar.
    pub fn add_trade(&mut self, volume: u64, price: f64) {
        self.add_price(price);
        self.volume = self.volume.saturating_add(volume);
    }
}
