//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid escaped {kind} {input:?}: {reason}")]
    InvalidEncoding {
        kind: &'static str,
        input: String,
        reason: String,
    },

    #[error("malformed module path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("malformed version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
