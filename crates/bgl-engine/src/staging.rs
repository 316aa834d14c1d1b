//! Staging writer: records in, CSV files and load jobs out
//!
//! Decouples "shape data" from "write data". A writer consumes one
//! [`BatchSource`] and owns one append-only CSV file per relation for the
//! run; once the source is exhausted it emits the [`LoadJob`]s that bulk-load
//! those files. Relations that produce no records on the first batch are a
//! typed [`RelationOutcome::Skipped`], distinct from success and from
//! failure, and never produce a job.
//!
//! Every record is validated against the relation's established header;
//! key-set drift anywhere in the stream aborts that relation's staging
//! loudly rather than silently dropping or reordering columns.

use crate::batch::{Batch, BatchSource, Record};
use crate::chunk::row_windows;
use crate::job::{LoadJob, TuningParams};
use bgl_common::BglError;
use chrono::Utc;
use serde_json::Value;
use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while staging one batch source.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("batch source error: {0}")]
    Source(#[from] BglError),

    #[error("batch carries {got} relation lists, writer was configured for {expected}")]
    RelationCountMismatch { expected: usize, got: usize },

    #[error(
        "record shape drift in relation {relation}: header [{header}], record keys [{keys}]"
    )]
    ShapeMismatch {
        relation: String,
        header: String,
        keys: String,
    },

    #[error("relation {0} was skipped on the first batch but received records later")]
    SkippedRelationData(String),
}

/// One (statement template, relation file) pair, positionally aligned with a
/// batch's relation lists.
#[derive(Debug, Clone)]
pub struct RelationSpec {
    /// Logical relation name, used in logs and job identities.
    pub relation: String,
    /// Opaque bulk statement template for this relation.
    pub statement: String,
    /// Staging file name; callers keep these globally unique per run,
    /// conventionally `<relation>_<provider>.csv`.
    pub file_name: String,
    /// Executor tuning, including the per-job row chunking.
    pub tuning: TuningParams,
}

impl RelationSpec {
    pub fn new(
        relation: impl Into<String>,
        statement: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            statement: statement.into(),
            file_name: file_name.into(),
            tuning: TuningParams::default(),
        }
    }

    /// Emit one load job per `size` rows instead of one for the whole file.
    pub fn with_commit_chunk_size(mut self, size: u64) -> Self {
        self.tuning.commit_chunk_size = Some(size);
        self
    }
}

/// Terminal staging outcome for one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationOutcome {
    Loaded {
        relation: String,
        rows: u64,
        jobs: u64,
    },
    /// No records on the first batch; no file, no job.
    Skipped { relation: String },
}

impl RelationOutcome {
    pub fn relation(&self) -> &str {
        match self {
            RelationOutcome::Loaded { relation, .. } => relation,
            RelationOutcome::Skipped { relation } => relation,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RelationOutcome::Skipped { .. })
    }
}

/// Result of staging one batch source: jobs in emission order plus
/// per-relation outcomes.
#[derive(Debug)]
pub struct StagedLoad {
    pub jobs: Vec<LoadJob>,
    pub outcomes: Vec<RelationOutcome>,
}

enum RelationState {
    /// No batch seen yet.
    Pending,
    Open(OpenRelation),
    Skipped,
}

struct OpenRelation {
    header: Vec<String>,
    writer: csv::Writer<File>,
    rows: u64,
}

/// Consumes one batch source and writes each relation's records to its own
/// staging file. Exclusively owns its staging files for the run.
pub struct StagingWriter {
    staging_dir: PathBuf,
    specs: Vec<RelationSpec>,
    states: Vec<RelationState>,
}

impl StagingWriter {
    /// Create a writer staging into `staging_dir` (created if absent).
    pub fn new(
        staging_dir: impl Into<PathBuf>,
        specs: Vec<RelationSpec>,
    ) -> Result<Self, StagingError> {
        let staging_dir = staging_dir.into();
        std::fs::create_dir_all(&staging_dir)?;
        let states = specs.iter().map(|_| RelationState::Pending).collect();
        Ok(Self {
            staging_dir,
            specs,
            states,
        })
    }

    /// Drain `source` to exhaustion, then close all files and emit jobs.
    pub fn stage<S: BatchSource>(mut self, source: &mut S) -> Result<StagedLoad, StagingError> {
        while let Some(batch) = source.next_batch()? {
            self.consume_batch(batch)?;
        }
        self.finish()
    }

    fn consume_batch(&mut self, batch: Batch) -> Result<(), StagingError> {
        if batch.relation_count() != self.specs.len() {
            return Err(StagingError::RelationCountMismatch {
                expected: self.specs.len(),
                got: batch.relation_count(),
            });
        }

        for (index, records) in batch.into_relations().into_iter().enumerate() {
            let spec = &self.specs[index];
            match &mut self.states[index] {
                state @ RelationState::Pending => {
                    if records.is_empty() {
                        info!(
                            relation = %spec.relation,
                            "no records in first batch; relation skipped for this run"
                        );
                        *state = RelationState::Skipped;
                    } else {
                        let mut open = open_relation(&self.staging_dir, spec, &records[0])?;
                        append_records(&mut open, &spec.relation, &records)?;
                        *state = RelationState::Open(open);
                    }
                }
                RelationState::Open(open) => {
                    append_records(open, &spec.relation, &records)?;
                }
                RelationState::Skipped => {
                    if !records.is_empty() {
                        return Err(StagingError::SkippedRelationData(spec.relation.clone()));
                    }
                }
            }
        }

        Ok(())
    }

    fn finish(self) -> Result<StagedLoad, StagingError> {
        let mut jobs = Vec::new();
        let mut outcomes = Vec::with_capacity(self.specs.len());
        let mut sequence = 0u64;

        for (spec, state) in self.specs.into_iter().zip(self.states) {
            match state {
                RelationState::Pending | RelationState::Skipped => {
                    outcomes.push(RelationOutcome::Skipped {
                        relation: spec.relation,
                    });
                }
                RelationState::Open(mut open) => {
                    open.writer.flush()?;
                    drop(open.writer);

                    let file = self.staging_dir.join(&spec.file_name);
                    let windows = match spec.tuning.commit_chunk_size {
                        Some(size) => row_windows(open.rows, size)
                            .into_iter()
                            .map(Some)
                            .collect(),
                        None => vec![None],
                    };

                    let job_count = windows.len() as u64;
                    for window in windows {
                        jobs.push(LoadJob {
                            relation: spec.relation.clone(),
                            statement: spec.statement.clone(),
                            file: file.clone(),
                            window,
                            tuning: spec.tuning.clone(),
                            sequence,
                            created_at: Utc::now(),
                        });
                        sequence += 1;
                    }

                    info!(
                        relation = %spec.relation,
                        rows = open.rows,
                        jobs = job_count,
                        file = %file.display(),
                        "relation staged"
                    );
                    outcomes.push(RelationOutcome::Loaded {
                        relation: spec.relation,
                        rows: open.rows,
                        jobs: job_count,
                    });
                }
            }
        }

        Ok(StagedLoad { jobs, outcomes })
    }
}

fn open_relation(
    staging_dir: &std::path::Path,
    spec: &RelationSpec,
    first_record: &Record,
) -> Result<OpenRelation, StagingError> {
    let path = staging_dir.join(&spec.file_name);
    let mut writer = csv::Writer::from_path(&path)?;

    let header: Vec<String> = first_record.keys().cloned().collect();
    writer.write_record(&header)?;
    debug!(
        relation = %spec.relation,
        file = %path.display(),
        columns = header.len(),
        "opened staging file"
    );

    Ok(OpenRelation {
        header,
        writer,
        rows: 0,
    })
}

fn append_records(
    open: &mut OpenRelation,
    relation: &str,
    records: &[Record],
) -> Result<(), StagingError> {
    for record in records {
        let uniform = record.len() == open.header.len()
            && open.header.iter().all(|key| record.contains_key(key));
        if !uniform {
            return Err(StagingError::ShapeMismatch {
                relation: relation.to_string(),
                header: open.header.join(","),
                keys: record.keys().cloned().collect::<Vec<_>>().join(","),
            });
        }

        let row: Vec<String> = open
            .header
            .iter()
            .map(|key| field_text(&record[key]))
            .collect();
        open.writer.write_record(&row)?;
        open.rows += 1;
    }
    Ok(())
}

/// Render one record value as a CSV field. Lists are `|`-joined, the
/// convention the downstream bulk statements split on.
fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(field_text)
            .collect::<Vec<_>>()
            .join("|"),
        // Nested objects are not part of the record contract; keep them
        // lossless as JSON text rather than guessing a flattening.
        Value::Object(_) => value.to_string(),
    }
}
