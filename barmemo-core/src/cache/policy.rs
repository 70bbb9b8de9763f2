//! Substitute index for positions before the retained range.
//!
//! Two situations ask for a value the series can no longer (or never could)
//! provide: an index evicted from the cache window, and an index before the
//! series' begin index. Both compute the value of logical index 0 instead.
//! That is historical behavior, kept as-is; the cache and the indicator base
//! both go through `below_range_substitute` so it can only change here.

/// Logical index whose value stands in for `requested`.
pub const fn below_range_substitute(_requested: usize) -> usize {
    0
}
