//! Quantum loop
//!
//! Bounded-concurrency scan over a range of branch indices.
//!
//! ```text
//!              job channel                 result channel
//!  consumer ──────────────► worker 0 ──┐
//!  (dispatch window)  ────► worker 1 ──┼──► (index, outcome) ──► reorder buffer ──► consume(index, r)
//!                     ────► worker N ──┘                          (BTreeMap)         ascending index
//! ```
//!
//! The consumer keeps at most `workers * IN_FLIGHT_PER_WORKER` indices
//! dispatched ahead of the next index it is waiting to deliver, so memory
//! stays bounded however large the address space is.

use std::collections::BTreeMap;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{trace, warn};

use crate::config::{Config, ScanFailurePolicy};
use crate::error::{FractalError, Result};

/// Indices a single worker may have queued ahead of the consumer
const IN_FLIGHT_PER_WORKER: u64 = 16;

/// Whether the consumer wants more branches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

/// Outcome of one branch task: `None` means nothing to deliver
type BranchOutcome<R> = Result<Option<R>>;

/// Worker pool settings for full scans
#[derive(Debug, Clone)]
pub struct QuantumLoop {
    workers: usize,
    timeout: Option<Duration>,
    failure_policy: ScanFailurePolicy,
}

impl QuantumLoop {
    pub fn new(workers: usize, timeout: Option<Duration>, failure_policy: ScanFailurePolicy) -> Self {
        Self {
            workers: workers.max(1),
            timeout,
            failure_policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.worker_count(),
            config.task_timeout(),
            config.scan_failure_policy,
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` for every index in `branches` and feed the results to
    /// `consume` in ascending index order
    ///
    /// - `task` runs on worker threads; `Ok(None)` results are skipped
    /// - `consume` runs on the calling thread and may stop the loop early
    /// - A failed branch aborts the loop unless the policy is `SkipBranch`
    /// - With a timeout set, waiting longer than it for any branch result
    ///   fails the loop with `Timeout`
    pub fn run<R, F, C>(&self, branches: Range<u64>, task: F, consume: C) -> Result<()>
    where
        R: Send,
        F: Fn(u64) -> BranchOutcome<R> + Sync,
        C: FnMut(u64, R) -> Result<Flow>,
    {
        self.execute(branches, task, consume).0
    }

    /// Same as [`QuantumLoop::run`], for tasks that change their branch
    ///
    /// When the loop ends before every result was delivered (an error, a
    /// timeout or `Flow::Break`), tasks that had already completed still
    /// changed their branch. Their results are returned next to the outcome,
    /// in ascending index order, so the caller can account for them.
    pub fn run_mutating<R, F, C>(&self, branches: Range<u64>, task: F, consume: C) -> (Result<()>, Vec<R>)
    where
        R: Send,
        F: Fn(u64) -> BranchOutcome<R> + Sync,
        C: FnMut(u64, R) -> Result<Flow>,
    {
        self.execute(branches, task, consume)
    }

    fn execute<R, F, C>(&self, branches: Range<u64>, task: F, mut consume: C) -> (Result<()>, Vec<R>)
    where
        R: Send,
        F: Fn(u64) -> BranchOutcome<R> + Sync,
        C: FnMut(u64, R) -> Result<Flow>,
    {
        if branches.is_empty() {
            return (Ok(()), Vec::new());
        }

        let span = branches.end - branches.start;
        let workers = (self.workers as u64).min(span) as usize;
        let window = workers as u64 * IN_FLIGHT_PER_WORKER;

        let stop = AtomicBool::new(false);
        let (job_tx, job_rx) = channel::unbounded::<u64>();
        let (result_tx, result_rx) = channel::unbounded::<(u64, BranchOutcome<R>)>();
        let mut pending: BTreeMap<u64, BranchOutcome<R>> = BTreeMap::new();

        let outcome = thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let task = &task;
                let stop = &stop;

                scope.spawn(move || {
                    for index in job_rx.iter() {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(index)))
                            .unwrap_or_else(|_| {
                                Err(FractalError::Worker(format!("branch {} task panicked", index)))
                            });
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);
            drop(job_rx);

            let outcome = self.drive(branches, window, &job_tx, &result_rx, &mut pending, &mut consume);

            // Let workers drain the job queue without doing more work
            stop.store(true, Ordering::Relaxed);
            drop(job_tx);
            outcome
        });

        // Every worker has been joined: whatever it finished is in the channel
        pending.extend(result_rx.try_iter());
        let undelivered: Vec<R> = pending
            .into_values()
            .filter_map(|outcome| outcome.ok().flatten())
            .collect();
        if !undelivered.is_empty() {
            trace!(count = undelivered.len(), "completed branches left undelivered");
        }

        (outcome, undelivered)
    }

    /// Dispatch indices and deliver results in order (runs on the caller)
    fn drive<R, C>(
        &self,
        branches: Range<u64>,
        window: u64,
        job_tx: &Sender<u64>,
        result_rx: &Receiver<(u64, BranchOutcome<R>)>,
        pending: &mut BTreeMap<u64, BranchOutcome<R>>,
        consume: &mut C,
    ) -> Result<()>
    where
        C: FnMut(u64, R) -> Result<Flow>,
    {
        let end = branches.end;
        let mut next_dispatch = branches.start;
        let mut next_emit = branches.start;

        while next_emit < end {
            while next_dispatch < end && next_dispatch - next_emit < window {
                job_tx
                    .send(next_dispatch)
                    .map_err(|_| FractalError::Worker("job queue closed".to_string()))?;
                next_dispatch += 1;
            }

            let (index, outcome) = self.recv(result_rx)?;
            pending.insert(index, outcome);

            while let Some(outcome) = pending.remove(&next_emit) {
                let index = next_emit;
                next_emit += 1;

                match outcome {
                    Ok(Some(result)) => {
                        if consume(index, result)? == Flow::Break {
                            trace!(branch = index, "scan stopped early");
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => match self.failure_policy {
                        ScanFailurePolicy::Abort => return Err(e),
                        ScanFailurePolicy::SkipBranch => {
                            warn!(branch = index, error = %e, "skipping unreadable branch");
                        }
                    },
                }
            }
        }

        Ok(())
    }

    fn recv<R>(&self, result_rx: &Receiver<(u64, BranchOutcome<R>)>) -> Result<(u64, BranchOutcome<R>)> {
        match self.timeout {
            Some(timeout) => result_rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => FractalError::Timeout(timeout.as_millis() as u64),
                RecvTimeoutError::Disconnected => {
                    FractalError::Worker("all scan workers exited".to_string())
                }
            }),
            None => result_rx
                .recv()
                .map_err(|_| FractalError::Worker("all scan workers exited".to_string())),
        }
    }
}
