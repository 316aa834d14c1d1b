//! Load jobs: one bulk statement bound to one staged file

use crate::chunk::RowWindow;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Per-relation tuning handed through to the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuningParams {
    /// Rows per transaction. When set, the staging writer emits one job per
    /// row window of this size instead of one job for the whole file.
    pub commit_chunk_size: Option<u64>,
}

/// A unit of work binding one bulk statement to one staged file.
///
/// Immutable: a retried job is the same value re-enqueued, not a new one.
/// The statement text and tuning parameters are opaque to the engine; they
/// are interpreted only by the externally supplied executor.
#[derive(Debug, Clone)]
pub struct LoadJob {
    /// Logical relation this job loads, e.g. "gene_synonym".
    pub relation: String,
    /// Opaque statement template executed as one transaction.
    pub statement: String,
    /// Staged CSV file the statement bulk-reads.
    pub file: PathBuf,
    /// Row range within the file, or `None` for the whole file.
    pub window: Option<RowWindow>,
    /// Tuning parameters for the executor.
    pub tuning: TuningParams,
    /// Position in the staging writer's emission order.
    pub sequence: u64,
    /// When the staging writer created this job.
    pub created_at: DateTime<Utc>,
}

impl LoadJob {
    /// Short human-readable identity for logs.
    pub fn describe(&self) -> String {
        match self.window {
            Some(window) => format!(
                "{}#{} ({} rows from {})",
                self.relation, self.sequence, window.limit, window.skip
            ),
            None => format!("{}#{} (full file)", self.relation, self.sequence),
        }
    }
}
