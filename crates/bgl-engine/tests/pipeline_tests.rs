//! End-to-end pipeline tests: staging -> pool -> completion barrier

use bgl_engine::executor::{BulkExecutor, ExecuteError};
use bgl_engine::{
    Batch, LoadJob, PoolConfig, Record, RelationSpec, RetryPolicy, ReworkPreference,
    VecBatchSource, WorkerPool,
};
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn record(pairs: &[(&str, serde_json::Value)]) -> Record {
    let mut map = Record::new();
    for (key, value) in pairs {
        map.insert(key.to_string(), value.clone());
    }
    map
}

fn fast_config(workers: usize, queue_capacity: usize) -> PoolConfig {
    PoolConfig {
        workers,
        queue_capacity,
        retry: RetryPolicy {
            max_attempts: 5,
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(4),
        },
        rework_preference: ReworkPreference::Strict,
    }
}

/// Executor scripted to fail N times for selected jobs, recording every
/// execution.
#[derive(Clone, Default)]
struct ScriptedExecutor {
    inner: Arc<ScriptedInner>,
}

#[derive(Default)]
struct ScriptedInner {
    remaining_failures: Mutex<HashMap<String, u32>>,
    permanent: Mutex<Vec<String>>,
    executions: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn job_key(job: &LoadJob) -> String {
        format!("{}#{}", job.relation, job.sequence)
    }

    fn fail_transient(&self, key: &str, times: u32) {
        self.inner
            .remaining_failures
            .lock()
            .unwrap()
            .insert(key.to_string(), times);
    }

    fn fail_permanently(&self, key: &str) {
        self.inner.permanent.lock().unwrap().push(key.to_string());
    }

    fn executions(&self) -> Vec<String> {
        self.inner.executions.lock().unwrap().clone()
    }

    fn executions_of(&self, key: &str) -> usize {
        self.executions().iter().filter(|k| *k == key).count()
    }
}

impl BulkExecutor for ScriptedExecutor {
    fn execute(&self, job: &LoadJob) -> Result<(), ExecuteError> {
        let key = Self::job_key(job);
        self.inner.executions.lock().unwrap().push(key.clone());

        if self.inner.permanent.lock().unwrap().contains(&key) {
            return Err(ExecuteError::Permanent("unknown label".to_string()));
        }
        if let Some(remaining) = self.inner.remaining_failures.lock().unwrap().get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExecuteError::Transient("lock conflict".to_string()));
            }
        }
        Ok(())
    }
}

/// Executor that blocks until released, for backpressure observation.
#[derive(Clone)]
struct GatedExecutor {
    gate: Receiver<()>,
}

impl GatedExecutor {
    fn new() -> (Self, Sender<()>) {
        let (release, gate) = unbounded();
        (Self { gate }, release)
    }
}

impl BulkExecutor for GatedExecutor {
    fn execute(&self, _job: &LoadJob) -> Result<(), ExecuteError> {
        self.gate
            .recv()
            .map_err(|_| ExecuteError::Transient("gate closed".to_string()))
    }
}

#[test]
fn test_end_to_end_chunked_relation_load() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ScriptedExecutor::default();
    let pool = WorkerPool::start(fast_config(2, 16), executor.clone()).unwrap();

    let specs =
        vec![RelationSpec::new("gene", "LOAD CSV stmt", "gene_FB.csv").with_commit_chunk_size(2)];
    let batches = vec![
        Batch::new(vec![vec![
            record(&[("a", json!("1")), ("b", json!("x"))]),
            record(&[("a", json!("2")), ("b", json!("y"))]),
            record(&[("a", json!("3")), ("b", json!("z"))]),
        ]]),
        Batch::new(vec![vec![
            record(&[("a", json!("4")), ("b", json!("p"))]),
            record(&[("a", json!("5")), ("b", json!("q"))]),
            record(&[("a", json!("6")), ("b", json!("r"))]),
        ]]),
    ];

    let outcomes = pool
        .run_batch_load(
            &mut VecBatchSource::new(batches),
            specs,
            dir.path(),
        )
        .unwrap();

    let summary = pool.wait_for_completion();
    assert_eq!(summary.committed, 3);
    assert_eq!(summary.dead_lettered, 0);
    assert_eq!(executor.executions().len(), 3);
    assert_eq!(outcomes.len(), 1);

    // the staged file holds the full relation, header first, input order
    let content = std::fs::read_to_string(dir.path().join("gene_FB.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "a,b");
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[1], "1,x");
    assert_eq!(lines[6], "6,r");

    pool.shutdown();
}

#[test]
fn test_job_failing_twice_executes_three_times() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ScriptedExecutor::default();
    executor.fail_transient("gene#0", 2);
    let pool = WorkerPool::start(fast_config(2, 16), executor.clone()).unwrap();

    let specs = vec![
        RelationSpec::new("gene", "stmt", "gene_MGI.csv"),
        RelationSpec::new("gene_synonym", "stmt", "gene_synonym_MGI.csv"),
    ];
    let batches = vec![Batch::new(vec![
        vec![record(&[("id", json!("MGI:1"))])],
        vec![record(&[("id", json!("MGI:1")), ("synonym", json!("Pax6"))])],
    ])];

    pool.run_batch_load(&mut VecBatchSource::new(batches), specs, dir.path())
        .unwrap();
    let summary = pool.wait_for_completion();

    // completion is reported only after the third, successful execution
    assert_eq!(summary.committed, 2);
    assert_eq!(summary.dead_lettered, 0);
    assert_eq!(executor.executions_of("gene#0"), 3);
    // the unrelated job was not blocked by gene#0's failures
    assert_eq!(executor.executions_of("gene_synonym#1"), 1);
    assert_eq!(pool.stats().retried, 2);

    pool.shutdown();
}

#[test]
fn test_permanent_failure_dead_letters_without_blocking_others() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ScriptedExecutor::default();
    executor.fail_permanently("allele#0");
    let pool = WorkerPool::start(fast_config(2, 16), executor.clone()).unwrap();

    let specs = vec![
        RelationSpec::new("allele", "stmt", "allele_ZFIN.csv"),
        RelationSpec::new("allele_gene", "stmt", "allele_gene_ZFIN.csv"),
    ];
    let batches = vec![Batch::new(vec![
        vec![record(&[("id", json!("ZDB-ALT-1"))])],
        vec![record(&[("allele", json!("ZDB-ALT-1")), ("gene", json!("ZDB-GENE-1"))])],
    ])];

    pool.run_batch_load(&mut VecBatchSource::new(batches), specs, dir.path())
        .unwrap();
    let summary = pool.wait_for_completion();

    assert_eq!(summary.committed, 1);
    assert_eq!(summary.dead_lettered, 1);
    // permanent failures execute exactly once
    assert_eq!(executor.executions_of("allele#0"), 1);

    let dead = pool.drain_dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].job.relation, "allele");
    assert_eq!(dead[0].attempts, 1);

    pool.shutdown();
}

#[test]
fn test_transient_retries_are_capped_then_dead_lettered() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ScriptedExecutor::default();
    // more failures than max_attempts allows
    executor.fail_transient("gene#0", 100);
    let pool = WorkerPool::start(fast_config(1, 4), executor.clone()).unwrap();

    let specs = vec![RelationSpec::new("gene", "stmt", "gene_WB.csv")];
    let batches = vec![Batch::new(vec![vec![record(&[("id", json!("WB:1"))])]])];

    pool.run_batch_load(&mut VecBatchSource::new(batches), specs, dir.path())
        .unwrap();
    let summary = pool.wait_for_completion();

    assert_eq!(summary.committed, 0);
    assert_eq!(summary.dead_lettered, 1);
    assert_eq!(executor.executions_of("gene#0"), 5);

    let dead = pool.drain_dead_letters();
    assert_eq!(dead[0].attempts, 5);
    assert!(dead[0].error.is_transient());

    pool.shutdown();
}

#[test]
fn test_submit_blocks_at_capacity_and_unblocks_when_drained() {
    let (executor, release) = GatedExecutor::new();
    let pool = Arc::new(WorkerPool::start(fast_config(1, 1), executor).unwrap());

    fn job(sequence: u64) -> LoadJob {
        LoadJob {
            relation: "gene".to_string(),
            statement: "stmt".to_string(),
            file: "gene.csv".into(),
            window: None,
            tuning: Default::default(),
            sequence,
            created_at: chrono::Utc::now(),
        }
    }

    // first job is taken by the lone worker and parks on the gate;
    // second fills the single queue slot
    pool.submit(job(0)).unwrap();
    pool.submit(job(1)).unwrap();

    let (submitted_tx, submitted_rx) = unbounded();
    let background_pool = Arc::clone(&pool);
    let submitter = std::thread::spawn(move || {
        background_pool.submit(job(2)).unwrap();
        submitted_tx.send(()).unwrap();
    });

    // the third submit must be blocked while the queue is at capacity
    assert!(submitted_rx
        .recv_timeout(Duration::from_millis(200))
        .is_err());

    // draining one job frees a slot and unblocks the submitter
    release.send(()).unwrap();
    assert!(submitted_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    submitter.join().unwrap();

    release.send(()).unwrap();
    release.send(()).unwrap();
    let summary = pool.wait_for_completion();
    assert_eq!(summary.committed, 3);
}
