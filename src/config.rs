//! Configuration for FractalKV
//!
//! Centralized configuration with sensible defaults. A `Config` is captured
//! by value when a collection is opened; nothing reads it from global state
//! afterwards.

use std::path::PathBuf;
use std::time::Duration;

use crate::addressing::ReduceLeft;

/// Main configuration for a FractalKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the store
    /// Internal structure:
    ///   {root}/
    ///     └── {collection}/
    ///           ├── 0/0/meta.json    (branch 0, reduce_left = 6)
    ///           └── d/1/leaf.json    (one leaf per branch)
    pub root: PathBuf,

    /// How many leading hash digits are discarded (controls fan-out)
    pub reduce_left: ReduceLeft,

    // -------------------------------------------------------------------------
    // Scan Configuration
    // -------------------------------------------------------------------------
    /// Worker threads for the quantum loop (None = available parallelism)
    pub max_workers: Option<usize>,

    /// Max wait for a single branch result (milliseconds, None = unbounded)
    pub task_timeout_ms: Option<u64>,

    /// What a scan does when one branch fails to load
    pub scan_failure_policy: ScanFailurePolicy,
}

/// Branch failure handling during full scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanFailurePolicy {
    /// Any branch failure aborts the whole operation
    #[default]
    Abort,

    /// Log the failure and continue with the next branch
    SkipBranch,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./FractalDB"),
            reduce_left: ReduceLeft::Six,
            max_workers: None,
            task_timeout_ms: None,
            scan_failure_policy: ScanFailurePolicy::Abort,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Worker count actually used by scans
    pub fn worker_count(&self) -> usize {
        self.max_workers.filter(|n| *n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// Per-branch timeout as a `Duration`
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store root directory
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root = path.into();
        self
    }

    /// Set the fan-out
    pub fn reduce_left(mut self, reduce_left: ReduceLeft) -> Self {
        self.config.reduce_left = reduce_left;
        self
    }

    /// Set the number of scan workers
    pub fn max_workers(mut self, count: usize) -> Self {
        self.config.max_workers = Some(count);
        self
    }

    /// Set the per-branch timeout (in milliseconds)
    pub fn task_timeout_ms(mut self, ms: u64) -> Self {
        self.config.task_timeout_ms = Some(ms);
        self
    }

    /// Set the scan failure policy
    pub fn scan_failure_policy(mut self, policy: ScanFailurePolicy) -> Self {
        self.config.scan_failure_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
