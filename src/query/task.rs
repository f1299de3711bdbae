//! Custom tasks
//!
//! A custom task receives the scan primitives instead of a predicate and
//! builds its own aggregation on top of them, usually with the accumulators
//! from [`crate::aggregation`].
//!
//! ```ignore
//! let oldest = users.run_custom_task(|ctx| {
//!     let mut max_age = Max::new();
//!     ctx.scan(|_, docs| {
//!         docs.iter().for_each(|user| max_age.set(user.age));
//!         Ok(Flow::Continue)
//!     })?;
//!     Ok(max_age.get())
//! }, DEFAULT_LIMIT)?;
//! ```

use std::ops::Range;

use crate::addressing::ReduceLeft;
use crate::document::Document;
use crate::error::Result;

use super::engine::QueryEngine;
use super::pool::Flow;

/// Capabilities handed to a custom task
pub struct TaskContext<'a, T> {
    engine: &'a QueryEngine<T>,
    limit: usize,
}

impl<'a, T: Document> TaskContext<'a, T> {
    pub(crate) fn new(engine: &'a QueryEngine<T>, limit: usize) -> Self {
        Self { engine, limit }
    }

    /// Documents of one branch (empty if the branch holds none)
    pub fn load_branch_docs(&self, branch_index: u64) -> Result<Vec<T>> {
        Ok(self.engine.load_branch_docs(branch_index)?.unwrap_or_default())
    }

    /// Run the quantum loop and feed non-empty branches to `visit` in
    /// ascending branch order
    pub fn scan<F>(&self, visit: F) -> Result<()>
    where
        F: FnMut(u64, Vec<T>) -> Result<Flow>,
    {
        self.engine.quantum().run(
            self.branch_range(),
            |index| self.engine.load_branch_docs(index),
            visit,
        )
    }

    /// Branch indices a scan visits
    pub fn branch_range(&self) -> Range<u64> {
        self.engine.branch_range()
    }

    pub fn reduce_left(&self) -> ReduceLeft {
        self.engine.reduce_left()
    }

    pub fn max_branches(&self) -> u64 {
        self.engine.reduce_left().max_branches()
    }

    /// Document limit requested by the caller
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn collection_name(&self) -> &str {
        self.engine.collection_name()
    }
}
