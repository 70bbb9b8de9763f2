//! Concrete indicator implementations.
//!
//! `ClosePrice`, `Sma` and `Ema` are cached: they implement `CachedIndicator`
//! and read their inputs through `value`, so nested indicators share the
//! memoized results of their inputs. `Volume` reads the series directly and is
//! never cached.

pub mod close_price;
pub mod ema;
pub mod sma;
pub mod volume;

pub use close_price::ClosePrice;
pub use ema::Ema;
pub use sma::Sma;
pub use volume::Volume;

/// Create synthetic daily bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
/// Bars end at 16:00, one day apart, starting 2024-01-02.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_time = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(16, 0, 0))
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                end_time: base_time + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Unbounded series holding `make_bars(closes)`.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> std::sync::Arc<crate::series::BaseBarSeries> {
    let series = crate::series::BaseBarSeries::new("TEST");
    for bar in make_bars(closes) {
        series.add_bar(bar).unwrap();
    }
    std::sync::Arc::new(series)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
