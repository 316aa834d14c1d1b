//! BGL Engine - batch-transaction execution engine
//!
//! The shared write pipeline every provider extractor feeds into. Extractors
//! produce [`Batch`]es of flat records; the engine stages them to per-relation
//! CSV files, turns each staged relation into one or more [`LoadJob`]s, and
//! drains those jobs through a bounded worker pool that executes each job as a
//! single transaction against an opaque [`BulkExecutor`].
//!
//! # Architecture
//!
//! - **Staging** ([`StagingWriter`]): decouples "shape data" from "write
//!   data". Records land in append-only CSV files consumed by the database's
//!   bulk import path instead of many small transactional writes.
//! - **Write pipeline** ([`WorkerPool`]): a bounded primary queue (submission
//!   blocks at capacity, which is the system's only backpressure mechanism)
//!   plus an unbounded rework queue that retries failed jobs with backoff.
//! - **Fan-out** ([`fan_out`]): one staging thread per provider sub-type, all
//!   submitting into one shared pool.
//! - **Completion barrier** ([`WorkerPool::wait_for_completion`]): dependent
//!   load phases (nodes before edges) sequence themselves by waiting until
//!   every submitted job is terminal.
//!
//! # Example
//!
//! ```no_run
//! use bgl_engine::{PoolConfig, RelationSpec, VecBatchSource, WorkerPool};
//! use bgl_engine::executor::{BulkExecutor, ExecuteError};
//! use bgl_engine::LoadJob;
//!
//! struct NoopExecutor;
//!
//! impl BulkExecutor for NoopExecutor {
//!     fn execute(&self, _job: &LoadJob) -> Result<(), ExecuteError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let pool = WorkerPool::start(PoolConfig::default(), NoopExecutor)?;
//!     let specs = vec![RelationSpec::new(
//!         "gene",
//!         "LOAD CSV WITH HEADERS FROM $file AS row CREATE (:Gene {primaryKey: row.primary_id})",
//!         "gene_test.csv",
//!     )];
//!     let mut source = VecBatchSource::new(vec![]);
//!     pool.run_batch_load(&mut source, specs, std::path::Path::new("./staging"))?;
//!     let summary = pool.wait_for_completion();
//!     println!("committed {} jobs", summary.committed);
//!     pool.shutdown();
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod chunk;
pub mod error;
pub mod executor;
pub mod fanout;
pub mod job;
pub mod pool;
pub mod staging;

// Re-export main types
pub use batch::{Batch, BatchSource, Record, VecBatchSource};
pub use chunk::{row_windows, split, RowWindow};
pub use error::EngineError;
pub use executor::{BulkExecutor, ExecuteError};
pub use fanout::{fan_out, FanOutReport, SubTypeOutcome};
pub use job::{LoadJob, TuningParams};
pub use pool::{
    CompletionSummary, DeadLetter, PoolConfig, PoolError, ReworkPreference, RetryPolicy,
    StatsSnapshot, WorkerPool,
};
pub use staging::{RelationOutcome, RelationSpec, StagedLoad, StagingError, StagingWriter};
