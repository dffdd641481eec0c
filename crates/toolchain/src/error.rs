//! Toolchain error types.

use thiserror::Error;

/// Module toolchain errors.
///
/// Every variant describes a failed resolution from the client's point of
/// view; the HTTP layer reports them as "not found" with the text verbatim.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The toolchain ran but reported an error for the module itself
    /// (unknown module, unknown version, VCS failure).
    #[error("failed to {operation} module {module}: {message}")]
    Module {
        operation: &'static str,
        module: String,
        message: String,
    },

    #[error("{command} failed: {status} (stderr=<<{stderr}>>)")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("internal error decoding {command} JSON output: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for toolchain operations.
pub type ToolchainResult<T> = std::result::Result<T, ToolchainError>;
