//! Worker pool: bounded primary queue, rework retry queue, completion barrier
//!
//! One pool per process, shared by every staging thread. Submission blocks
//! while the bounded primary queue is at capacity; that is the system's sole
//! backpressure mechanism and keeps staging from racing ahead of ingestion.
//! Failed jobs are requeued through an unbounded rework queue that workers
//! prefer over new work (configurable), with exponential backoff and a retry
//! cap; exhausted or permanently failing jobs land in a dead-letter list so
//! they can never block unrelated jobs' completion.
//!
//! Workers are stateless, long-lived threads; a failing job never crashes or
//! blocks its worker's loop. Execution order across workers is unspecified:
//! callers needing cross-phase ordering (nodes before the edges that
//! reference them) wait on [`WorkerPool::wait_for_completion`] between
//! phases.

use crate::batch::BatchSource;
use crate::error::EngineError;
use crate::executor::{BulkExecutor, ExecuteError};
use crate::job::LoadJob;
use crate::staging::{RelationOutcome, RelationSpec, StagingWriter};
use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use crossbeam::select;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How long an idle worker waits between rework polls once the primary
/// queue has closed.
const DRAIN_POLL: Duration = Duration::from_millis(25);

/// Errors surfaced by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool has been shut down")]
    Shutdown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Whether workers drain the rework queue before taking new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReworkPreference {
    /// Always check rework first. Under sustained conflict this can
    /// starve new work.
    #[default]
    Strict,
    /// Take whichever queue is ready.
    Fair,
}

/// Retry behavior for transient write failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before a transient failure is dead-lettered.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub backoff_base: Duration,
    /// Upper bound on any single retry delay.
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after `attempt` failed attempts.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }
}

/// Pool construction parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Worker thread count.
    pub workers: usize,
    /// Primary queue bound; submission blocks at this depth.
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
    pub rework_preference: ReworkPreference,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(2, 8),
            queue_capacity: 100,
            retry: RetryPolicy::default(),
            rework_preference: ReworkPreference::default(),
        }
    }
}

/// Monotonic pool counters.
#[derive(Debug, Default)]
struct Stats {
    submitted: AtomicU64,
    committed: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
}

/// Point-in-time view of the pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub committed: u64,
    pub retried: u64,
    pub dead_lettered: u64,
}

/// A job that exhausted its retries or failed permanently.
#[derive(Debug)]
pub struct DeadLetter {
    pub job: Arc<LoadJob>,
    pub attempts: u32,
    pub error: ExecuteError,
}

/// What the completion barrier observed once every job went terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionSummary {
    pub committed: u64,
    pub dead_lettered: u64,
}

struct JobEnvelope {
    job: Arc<LoadJob>,
    /// Failed attempts so far; the job value itself is immutable.
    attempts: u32,
}

struct Shared {
    executor: Arc<dyn BulkExecutor>,
    rework_tx: Sender<JobEnvelope>,
    /// Jobs submitted but not yet terminal (queued, reworking, or in flight).
    pending: Mutex<u64>,
    all_terminal: Condvar,
    dead: Mutex<Vec<DeadLetter>>,
    stats: Stats,
    retry: RetryPolicy,
    preference: ReworkPreference,
}

/// The shared write pipeline: owns both queues and the worker threads.
///
/// Constructed once per process and passed by handle; independent pools may
/// coexist (tests build throwaway ones).
pub struct WorkerPool {
    shared: Arc<Shared>,
    primary_tx: Option<Sender<JobEnvelope>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the worker threads and return the pool handle.
    pub fn start(
        config: PoolConfig,
        executor: impl BulkExecutor + 'static,
    ) -> Result<Self, PoolError> {
        let (primary_tx, primary_rx) = bounded(config.queue_capacity.max(1));
        let (rework_tx, rework_rx) = unbounded();

        let shared = Arc::new(Shared {
            executor: Arc::new(executor),
            rework_tx,
            pending: Mutex::new(0),
            all_terminal: Condvar::new(),
            dead: Mutex::new(Vec::new()),
            stats: Stats::default(),
            retry: config.retry,
            preference: config.rework_preference,
        });

        let worker_count = config.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let shared = Arc::clone(&shared);
            let primary_rx = primary_rx.clone();
            let rework_rx = rework_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("bgl-writer-{index}"))
                .spawn(move || worker_loop(shared, primary_rx, rework_rx))?;
            workers.push(handle);
        }

        info!(
            workers = worker_count,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Ok(Self {
            shared,
            primary_tx: Some(primary_tx),
            workers,
        })
    }

    /// Enqueue one job, blocking while the primary queue is at capacity.
    pub fn submit(&self, job: LoadJob) -> Result<(), PoolError> {
        let primary_tx = self.primary_tx.as_ref().ok_or(PoolError::Shutdown)?;

        *lock(&self.shared.pending) += 1;
        self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(job = %job.describe(), "submitting load job");

        let envelope = JobEnvelope {
            job: Arc::new(job),
            attempts: 0,
        };
        if primary_tx.send(envelope).is_err() {
            // Workers are gone; unwind the counter so barrier waiters are
            // not stranded.
            mark_terminal(&self.shared);
            return Err(PoolError::Shutdown);
        }
        Ok(())
    }

    /// Stage one batch source and submit the resulting jobs in order.
    ///
    /// Returns per-relation staging outcomes. Does not wait for the jobs to
    /// execute; call [`wait_for_completion`](Self::wait_for_completion).
    pub fn run_batch_load<S: BatchSource>(
        &self,
        source: &mut S,
        specs: Vec<RelationSpec>,
        staging_dir: &Path,
    ) -> Result<Vec<RelationOutcome>, EngineError> {
        let writer = StagingWriter::new(staging_dir, specs).map_err(EngineError::Staging)?;
        let staged = writer.stage(source).map_err(EngineError::Staging)?;
        for job in staged.jobs {
            self.submit(job)?;
        }
        Ok(staged.outcomes)
    }

    /// Block until both queues are empty and no job is in flight.
    ///
    /// Returns only once every submitted job is terminal (committed or
    /// dead-lettered); in particular it cannot return while the rework
    /// queue still holds jobs.
    pub fn wait_for_completion(&self) -> CompletionSummary {
        let mut pending = lock(&self.shared.pending);
        while *pending > 0 {
            pending = self
                .shared
                .all_terminal
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
        CompletionSummary {
            committed: self.shared.stats.committed.load(Ordering::Relaxed),
            dead_lettered: self.shared.stats.dead_lettered.load(Ordering::Relaxed),
        }
    }

    /// Take the accumulated dead letters.
    pub fn drain_dead_letters(&self) -> Vec<DeadLetter> {
        std::mem::take(&mut *lock(&self.shared.dead))
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.shared.stats.submitted.load(Ordering::Relaxed),
            committed: self.shared.stats.committed.load(Ordering::Relaxed),
            retried: self.shared.stats.retried.load(Ordering::Relaxed),
            dead_lettered: self.shared.stats.dead_lettered.load(Ordering::Relaxed),
        }
    }

    /// Close the primary queue and join all workers once outstanding work
    /// (including rework) drains.
    pub fn shutdown(mut self) -> CompletionSummary {
        self.close_and_join();
        CompletionSummary {
            committed: self.shared.stats.committed.load(Ordering::Relaxed),
            dead_lettered: self.shared.stats.dead_lettered.load(Ordering::Relaxed),
        }
    }

    fn close_and_join(&mut self) {
        if self.primary_tx.take().is_some() {
            for handle in self.workers.drain(..) {
                if handle.join().is_err() {
                    error!("worker thread panicked");
                }
            }
            debug!("worker pool shut down");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn mark_terminal(shared: &Shared) {
    let mut pending = lock(&shared.pending);
    *pending -= 1;
    if *pending == 0 {
        shared.all_terminal.notify_all();
    }
}

fn worker_loop(shared: Arc<Shared>, primary_rx: Receiver<JobEnvelope>, rework_rx: Receiver<JobEnvelope>) {
    let mut primary_open = true;
    loop {
        let envelope = if primary_open {
            next_job(&shared, &primary_rx, &rework_rx, &mut primary_open)
        } else {
            // Primary queue closed: drain remaining rework, then exit once
            // every job is terminal.
            match rework_rx.recv_timeout(DRAIN_POLL) {
                Ok(envelope) => Some(envelope),
                Err(RecvTimeoutError::Timeout) => {
                    if *lock(&shared.pending) == 0 {
                        break;
                    }
                    None
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        };

        if let Some(envelope) = envelope {
            execute_one(&shared, envelope);
        }
    }
    debug!("worker exiting");
}

/// Pick the next job while the primary queue is open. Rework has priority
/// under the strict preference.
fn next_job(
    shared: &Shared,
    primary_rx: &Receiver<JobEnvelope>,
    rework_rx: &Receiver<JobEnvelope>,
    primary_open: &mut bool,
) -> Option<JobEnvelope> {
    if shared.preference == ReworkPreference::Strict {
        if let Ok(envelope) = rework_rx.try_recv() {
            return Some(envelope);
        }
    }

    select! {
        recv(rework_rx) -> msg => msg.ok(),
        recv(primary_rx) -> msg => match msg {
            Ok(envelope) => Some(envelope),
            Err(_) => {
                *primary_open = false;
                None
            }
        },
    }
}

/// Run one job as one transaction. Never panics, never blocks the loop on
/// failure: the job is requeued, dead-lettered, or committed.
fn execute_one(shared: &Shared, envelope: JobEnvelope) {
    let JobEnvelope { job, attempts } = envelope;
    let attempt = attempts + 1;

    debug!(job = %job.describe(), attempt, "executing load job");
    match shared.executor.execute(&job) {
        Ok(()) => {
            shared.stats.committed.fetch_add(1, Ordering::Relaxed);
            debug!(job = %job.describe(), attempt, "load job committed");
            mark_terminal(shared);
        }
        Err(err) => {
            let retryable = err.is_transient() && attempt < shared.retry.max_attempts;
            if retryable {
                let delay = shared.retry.backoff(attempt);
                warn!(
                    job = %job.describe(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "load job failed; requeueing for rework"
                );
                // Sleeping before the requeue throttles a conflicting job
                // without timer machinery; the cap bounds the stall.
                thread::sleep(delay);
                shared.stats.retried.fetch_add(1, Ordering::Relaxed);
                let requeued = JobEnvelope {
                    job,
                    attempts: attempt,
                };
                let _ = shared.rework_tx.send(requeued);
            } else {
                error!(
                    job = %job.describe(),
                    attempt,
                    error = %err,
                    "load job dead-lettered"
                );
                lock(&shared.dead).push(DeadLetter {
                    job,
                    attempts: attempt,
                    error: err,
                });
                shared.stats.dead_lettered.fetch_add(1, Ordering::Relaxed);
                mark_terminal(shared);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    struct AlwaysOk;

    impl BulkExecutor for AlwaysOk {
        fn execute(&self, _job: &LoadJob) -> Result<(), ExecuteError> {
            Ok(())
        }
    }

    fn test_job(relation: &str, sequence: u64) -> LoadJob {
        LoadJob {
            relation: relation.to_string(),
            statement: "RETURN 1".to_string(),
            file: PathBuf::from(format!("{relation}.csv")),
            window: None,
            tuning: Default::default(),
            sequence,
            created_at: Utc::now(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_submit_and_complete() {
        let config = PoolConfig {
            workers: 2,
            queue_capacity: 4,
            retry: fast_retry(),
            rework_preference: ReworkPreference::Strict,
        };
        let pool = WorkerPool::start(config, AlwaysOk).unwrap();

        for sequence in 0..10 {
            pool.submit(test_job("gene", sequence)).unwrap();
        }
        let summary = pool.wait_for_completion();
        assert_eq!(summary.committed, 10);
        assert_eq!(summary.dead_lettered, 0);

        let stats = pool.stats();
        assert_eq!(stats.submitted, 10);
        assert_eq!(stats.retried, 0);
        pool.shutdown();
    }

    #[test]
    fn test_wait_with_nothing_submitted_returns_immediately() {
        let pool = WorkerPool::start(PoolConfig::default(), AlwaysOk).unwrap();
        let summary = pool.wait_for_completion();
        assert_eq!(summary.committed, 0);
    }

    #[test]
    fn test_barrier_can_sequence_phases() {
        let pool = WorkerPool::start(PoolConfig::default(), AlwaysOk).unwrap();

        pool.submit(test_job("gene", 0)).unwrap();
        let first = pool.wait_for_completion();
        assert_eq!(first.committed, 1);

        pool.submit(test_job("gene_disease", 0)).unwrap();
        let second = pool.wait_for_completion();
        assert_eq!(second.committed, 2);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(9), Duration::from_millis(500));
    }
}
