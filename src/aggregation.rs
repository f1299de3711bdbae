//! Aggregation accumulators
//!
//! Small reducers used inside custom tasks. Each one is fed with `set` and
//! read with `get`.

use std::ops::AddAssign;

use crate::error::{FractalError, Result};

/// Running total
#[derive(Debug, Clone, Default)]
pub struct Sum<T> {
    value: T,
}

impl<T: Copy + Default + AddAssign> Sum<T> {
    pub fn new() -> Self {
        Self { value: T::default() }
    }

    pub fn set(&mut self, number: T) {
        self.value += number;
    }

    pub fn get(&self) -> T {
        self.value
    }
}

/// Largest value seen so far
#[derive(Debug, Clone, Default)]
pub struct Max<T> {
    value: Option<T>,
}

impl<T: Copy + PartialOrd> Max<T> {
    pub fn new() -> Self {
        Self { value: None }
    }

    pub fn set(&mut self, number: T) {
        if self.value.map_or(true, |current| number > current) {
            self.value = Some(number);
        }
    }

    /// `None` until the first `set`
    pub fn get(&self) -> Option<T> {
        self.value
    }
}

/// Smallest value seen so far
///
/// Unset is tracked explicitly; zero is an ordinary value.
#[derive(Debug, Clone, Default)]
pub struct Min<T> {
    value: Option<T>,
}

impl<T: Copy + PartialOrd> Min<T> {
    pub fn new() -> Self {
        Self { value: None }
    }

    pub fn set(&mut self, number: T) {
        if self.value.map_or(true, |current| number < current) {
            self.value = Some(number);
        }
    }

    /// `None` until the first `set`
    pub fn get(&self) -> Option<T> {
        self.value
    }
}

/// Arithmetic mean
#[derive(Debug, Clone, Default)]
pub struct Average {
    total: f64,
    count: u64,
}

impl Average {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, number: impl Into<f64>) {
        self.total += number.into();
        self.count += 1;
    }

    /// Fails with `EmptyAggregate` before the first observation
    pub fn get(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(FractalError::EmptyAggregate);
        }
        Ok(self.total / self.count as f64)
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Counter with a limit, used to stop a scan once enough documents are in
#[derive(Debug, Clone)]
pub struct Counter {
    limit: usize,
    count: usize,
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(crate::query::DEFAULT_LIMIT)
    }
}

impl Counter {
    pub fn new(limit: usize) -> Self {
        Self { limit, count: 0 }
    }

    /// Count one more
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        self.count += 1;
    }

    /// True once the limit has been reached
    pub fn check(&self) -> bool {
        self.count >= self.limit
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
