//! Error types shared by series, caches and indicators.
//!
//! Every variant of `IndicatorError` is a contract violation: a caller or
//! series implementation broke an invariant the cache depends on. They are
//! propagated with `?` through nested indicators instead of being recovered.

use chrono::NaiveDateTime;
use thiserror::Error;

pub type IndicatorResult<T> = Result<T, IndicatorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("malformed series: removed bar count {removed} exceeds end index {end}")]
    MalformedSeries { removed: usize, end: usize },

    #[error("series maximum bar count must be greater than zero")]
    ZeroMaximumBarCount,

    #[error(
        "index {index} maps before the first cache slot (highest result index {highest}, {len} slots)"
    )]
    SlotUnderflow {
        index: usize,
        highest: usize,
        len: usize,
    },

    #[error("cannot manually put values in a {0} cache")]
    UnsupportedPut(&'static str),

    #[error("no bar available at index {0}")]
    BarUnavailable(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("maximum bar count must be greater than zero")]
    ZeroMaximumBarCount,

    #[error("cannot add bar ending {new}: last bar ends {last}")]
    OutOfOrder {
        last: NaiveDateTime,
        new: NaiveDateTime,
    },

    #[error("series '{0}' has no bars")]
    Empty(String),
}
