//! BGL Ingest Library
//!
//! Provider extract/transform modules feeding the BGL engine.
//!
//! # Supported Data Types
//!
//! - **gene**: curated gene records (BGI-style JSON)
//! - **allele**: allele records with gene associations
//! - **disease**: disease-annotation records (DAF-style JSON)
//! - **ontology**: OBO flat-file ontologies (DO, SO, GO, ...)
//! - **orthology**: cross-species orthology pairs
//!
//! Every module turns its provider payload into engine batches plus an
//! ordered relation-spec list; none of them talk to the database directly.
//! The [`runner`] wires configured providers through the shared worker pool
//! in dependency-ordered phases.
//!
//! # Example
//!
//! ```no_run
//! use bgl_engine::{PoolConfig, WorkerPool};
//! use bgl_ingest::config::LoadConfig;
//! use bgl_ingest::runner;
//!
//! fn main() -> anyhow::Result<()> {
//!     struct Noop;
//!     impl bgl_engine::BulkExecutor for Noop {
//!         fn execute(&self, _job: &bgl_engine::LoadJob) -> Result<(), bgl_engine::ExecuteError> {
//!             Ok(())
//!         }
//!     }
//!
//!     let config = LoadConfig::from_file("bgl.yaml")?;
//!     let pool = WorkerPool::start(PoolConfig::default(), Noop)?;
//!     let report = runner::run_load(&config, &pool)?;
//!     println!("committed {} jobs", report.summary.committed);
//!     Ok(())
//! }
//! ```

pub mod allele;
pub mod config;
pub mod disease;
pub mod download;
pub mod gene;
pub mod ontology;
pub mod orthology;
pub mod runner;
