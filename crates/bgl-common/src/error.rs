//! Error types for BGL

use thiserror::Error;

/// Result type alias for BGL operations
pub type Result<T> = std::result::Result<T, BglError>;

/// Main error type for BGL
#[derive(Error, Debug)]
pub enum BglError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Staging error: {0}")]
    Staging(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
