//! Error types for fleet-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while rendering the manifest.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// Nothing to render.
    #[error("roster has no repositories")]
    EmptyRoster,

    /// A repository without runners would render no services.
    #[error("repository {repository} has no runners")]
    NoRunners { repository: String },

    /// Two repositories would share one credential anchor.
    #[error("anchor '{anchor}' is used by both {first} and {second}")]
    DuplicateAnchor {
        anchor: String,
        first: String,
        second: String,
    },

    /// Anchor contains characters YAML parsers reject in anchor names.
    #[error("anchor '{anchor}' of {repository} must match [A-Za-z0-9_-]+")]
    InvalidAnchor { anchor: String, repository: String },

    /// Service key contains characters that are not safe as a YAML mapping key.
    #[error("service '{service}' must match [A-Za-z0-9._-]+")]
    InvalidService { service: String },

    /// Two runners would map to the same compose service key.
    #[error("service '{service}' is defined more than once")]
    DuplicateService { service: String },

    /// Two runners would mount the same host work directory.
    #[error("work dir '{work_dir}' is shared by more than one runner")]
    DuplicateWorkDir { work_dir: String },

    /// Credential refresh has not run for this repository.
    #[error("no credential for {repository}")]
    MissingCredential { repository: String },
}
