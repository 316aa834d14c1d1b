//! Engine-level error type

use crate::pool::PoolError;
use crate::staging::StagingError;
use thiserror::Error;

/// Errors surfaced by combined staging + submission operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
