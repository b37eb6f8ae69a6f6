//! Error types for fleet-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from roster operations.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed roster or seed file on load.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A repository reference that is not `owner/repo` shaped.
    #[error("invalid repository format: {input} (expected owner/repo)")]
    InvalidRepoRef { input: String },

    /// The repository is already part of the roster.
    #[error("repository {owner}/{name} already exists in roster")]
    DuplicateRepository { owner: String, name: String },

    /// Every repository needs at least one runner.
    #[error("runner count must be at least 1 (got {0})")]
    InvalidRunnerCount(usize),
}

/// Convenience constructor for [`RosterError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RosterError {
    RosterError::Io {
        path: path.into(),
        source,
    }
}
