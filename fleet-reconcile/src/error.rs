//! Error types for fleet-reconcile.

use std::path::PathBuf;

use thiserror::Error;

use fleet_renderer::RenderError;

/// Failure of one orchestration-tool invocation.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The program could not be started at all.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("`{command}` failed ({status}){}", fmt_output(.output))]
    Failed {
        command: String,
        status: String,
        /// Captured stdout + stderr; empty when output was streamed.
        output: String,
    },
}

fn fmt_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

/// All errors that can arise from a reconciliation run.
///
/// Every phase maps its failure onto one variant; whether the run aborts or
/// carries on with a warning is decided by the phase's policy.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to back up {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Writing the manifest failed, with annotated path for context.
    #[error("failed to write manifest {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest validation failed: {0}")]
    Validation(#[source] ComposeError),

    #[error("failed to stop existing runners: {0}")]
    Stop(#[source] ComposeError),

    #[error("failed to pull runner images: {0}")]
    Pull(#[source] ComposeError),

    #[error("failed to start runners: {0}")]
    Start(#[source] ComposeError),

    #[error("failed to query runner status: {0}")]
    Status(#[source] ComposeError),

    #[error("only {running} out of {expected} runners are running")]
    NotConverged { running: usize, expected: usize },
}

/// Convenience constructor for [`ReconcileError::Persist`].
pub(crate) fn persist_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReconcileError {
    ReconcileError::Persist {
        path: path.into(),
        source,
    }
}
