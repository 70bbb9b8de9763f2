//! Cache that stores nothing.

use super::{computed, CacheKey, IndicatorValueCache};
use crate::error::IndicatorResult;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::marker::PhantomData;

#[derive(Debug)]
pub struct PassthroughCache<T> {
    _values: PhantomData<fn() -> T>,
}

impl<T> PassthroughCache<T> {
    pub fn new() -> Self {
        Self {
            _values: PhantomData,
        }
    }
}

impl<T> Default for PassthroughCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> IndicatorValueCache<T> for PassthroughCache<T> {
    fn get(
        &self,
        key: &CacheKey<'_>,
        compute: &dyn Fn(usize) -> IndicatorResult<T>,
    ) -> IndicatorResult<T> {
        computed("disabled", key.index(), compute)
    }

    fn put(&self, _key: &CacheKey<'_>, _value: T) -> IndicatorResult<()> {
        Ok(())
    }

    fn snapshot(&self) -> BTreeMap<usize, T> {
        BTreeMap::new()
    }

    fn clear(&self) {}

    fn stores_values(&self) -> bool {
        false
    }
}
