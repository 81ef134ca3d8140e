//! Domain-level error taxonomy for the deployment pipeline.

use std::path::PathBuf;

/// Errors produced by the deployment pipeline and its stages.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("invalid named addresses: {0}")]
    InvalidNamedAddresses(String),

    #[error("invalid publish mode: {0}")]
    InvalidPublishMode(String),

    #[error("resource account seed is required for resource-account publishing")]
    MissingSeed,

    #[error("signing key is not configured")]
    MissingSigningKey,

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("archive entry escapes the extraction root: {0}")]
    PathTraversal(String),

    #[error("Move.toml not found in package")]
    ManifestNotFound,

    #[error("sources/ directory not found in package root {0}")]
    SourcesMissing(PathBuf),

    #[error("failed to spawn {tool}: {source}")]
    SpawnFailure {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code}")]
    ToolFailure {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("{tool} timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("could not extract a transaction hash from tool output")]
    UnrecognizedOutput,

    #[error("transaction verification failed: {0}")]
    VerificationFailed(String),

    #[error("job not found: {0}")]
    JobNotFound(uuid::Uuid),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Standard-error text captured from a failing tool invocation, if any.
    pub fn captured_stderr(&self) -> Option<&str> {
        match self {
            DeployError::ToolFailure { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Result type for deployment pipeline operations.
pub type Result<T> = std::result::Result<T, DeployError>;
