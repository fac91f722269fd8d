//! # Filters: synchronous observers producing named results.
//!
//! A [`Filter`] runs inline inside [`Engine::submit`](crate::Engine::submit),
//! once per action, in registration order. Its return value is stored in the
//! item's [`Results`](crate::Results) under the filter's registered name, where
//! later filters, renderers and the caller can read it.
//!
//! ## Example
//! ```rust
//! use actionvisor::{FilterFn, FilterRef, StreamItem};
//!
//! let stamp: FilterRef = FilterFn::arc(|item: &StreamItem| {
//!     Ok(format!("#{}", item.seq()))
//! });
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::item::{Output, StreamItem};

/// Synchronous action observer.
///
/// Returning `Err` aborts the current dispatch: later filters do not run, the
/// item is not published and `submit` returns
/// [`DispatchError::FilterFailed`](crate::DispatchError::FilterFailed).
pub trait Filter: Send + Sync + 'static {
    /// Computes this filter's result for `item`.
    ///
    /// `item.results()` already holds the results of earlier filters.
    fn apply(&self, item: &StreamItem) -> anyhow::Result<Output>;
}

/// Shared handle to a filter.
pub type FilterRef = Arc<dyn Filter>;

/// Function-backed filter.
///
/// Wraps `F: Fn(&StreamItem) -> anyhow::Result<T>` and boxes `T` as the result.
pub struct FilterFn<F> {
    f: F,
}

impl<F> FilterFn<F> {
    /// Creates a new function-backed filter.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the filter and returns it as a shared handle.
    pub fn arc<T>(f: F) -> Arc<Self>
    where
        F: Fn(&StreamItem) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Arc::new(Self::new(f))
    }
}

impl<F, T> Filter for FilterFn<F>
where
    F: Fn(&StreamItem) -> anyhow::Result<T> + Send + Sync + 'static,
    T: Any + Send + Sync,
{
    fn apply(&self, item: &StreamItem) -> anyhow::Result<Output> {
        let value = (self.f)(item)?;
        Ok(Arc::new(value))
    }
}
