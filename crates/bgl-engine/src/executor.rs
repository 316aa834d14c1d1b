//! The opaque database driver seam
//!
//! The engine never speaks a wire protocol. Callers supply a [`BulkExecutor`]
//! that runs one [`LoadJob`] as one transaction against whatever store they
//! target; the engine only cares whether a failure is worth retrying.

use crate::job::LoadJob;
use thiserror::Error;

/// Failure classification for a single transaction attempt.
///
/// The pool retries lock conflicts and transient resource errors through
/// the rework queue; statements that can never succeed are dead-lettered
/// instead of retrying forever.
#[derive(Debug, Clone, Error)]
pub enum ExecuteError {
    /// Lock conflict or transient resource error; safe to retry.
    #[error("transient write failure: {0}")]
    Transient(String),

    /// The statement or its inputs are invalid; retrying cannot help.
    #[error("permanent write failure: {0}")]
    Permanent(String),
}

impl ExecuteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExecuteError::Transient(_))
    }
}

/// Executes one load job as a single database transaction.
///
/// Implementations must be safe for concurrent use from every worker thread;
/// the engine shares one executor across the pool. Conflict detection is
/// deferred to the store itself: rather than coordinate locks among writers,
/// a rejected transaction is reported as [`ExecuteError::Transient`] and the
/// pool re-runs it.
pub trait BulkExecutor: Send + Sync {
    fn execute(&self, job: &LoadJob) -> Result<(), ExecuteError>;
}
