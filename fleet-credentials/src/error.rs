//! Error types for fleet-credentials.

use thiserror::Error;

/// Failures while obtaining a registration credential.
///
/// Every variant aborts the reconciliation run.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// DNS, connect, TLS or timeout failure.
    #[error("request for {repository} failed: {source}")]
    Transport {
        repository: String,
        #[source]
        source: Box<ureq::Transport>,
    },

    /// The API answered with anything other than `201 Created`.
    #[error("GitHub API error for {repository} (status {status}): {body}")]
    Rejected {
        repository: String,
        status: u16,
        body: String,
    },

    /// The `201` body could not be decoded.
    #[error("decoding token response for {repository}: {source}")]
    Decode {
        repository: String,
        #[source]
        source: std::io::Error,
    },
}

impl CredentialError {
    /// `true` for authorization / quota style failures reported by the API.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CredentialError::Rejected { .. })
    }
}
