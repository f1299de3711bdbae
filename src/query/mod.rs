//! Query Module
//!
//! Predicate queries over a whole collection without secondary indexes.
//!
//! ## Responsibilities
//! - Visit every branch index through a bounded worker pool ("quantum loop")
//! - Deliver branch results in ascending index order
//! - find / count / delete / update by predicate
//! - Custom tasks built from the same primitives
//!
//! ## Failure Semantics
//! A branch that cannot be read fails the whole operation unless the
//! collection was opened with `ScanFailurePolicy::SkipBranch`. No partial
//! results are returned on failure or timeout.

mod engine;
mod pool;
mod task;

pub use engine::{QueryEngine, DEFAULT_LIMIT};
pub use pool::{Flow, QuantumLoop};
pub use task::TaskContext;
