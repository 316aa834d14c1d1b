//! BGL Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging, and checksum utilities for the BGL
//! workspace.
//!
//! # Overview
//!
//! Every BGL crate builds on this one:
//!
//! - **Error Handling**: the [`BglError`] type and [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Checksums**: SHA-256 verification for downloaded source files
//!
//! # Example
//!
//! ```no_run
//! use bgl_common::{Result, checksum};
//!
//! fn verify_download(path: &str, expected: &str) -> Result<()> {
//!     checksum::verify_file_sha256(path, expected)?;
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{BglError, Result};
