//! GitHub registration-token client.
//!
//! `POST {api}/repos/{owner}/{name}/actions/runners/registration-token`,
//! bearer-authenticated. Only `201 Created` counts as success; the token is
//! valid for roughly one hour.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use fleet_core::types::Repository;

use crate::error::CredentialError;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Bound on the whole request, connect included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A short-lived runner registration token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Anything that can issue a registration credential for a repository.
pub trait CredentialSource {
    fn fetch(&self, repository: &Repository) -> Result<Credential, CredentialError>;
}

/// `ureq`-backed [`CredentialSource`] talking to the GitHub REST API.
pub struct GithubClient {
    agent: ureq::Agent,
    api_url: String,
    api_token: String,
}

impl GithubClient {
    /// Client for the public API with the default timeout.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_api_url(api_token, DEFAULT_API_URL)
    }

    /// Client for a custom API base (GitHub Enterprise, test stubs).
    pub fn with_api_url(api_token: impl Into<String>, api_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        GithubClient {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    pub fn token_url(&self, owner: &str, name: &str) -> String {
        format!(
            "{}/repos/{owner}/{name}/actions/runners/registration-token",
            self.api_url
        )
    }
}

impl CredentialSource for GithubClient {
    fn fetch(&self, repository: &Repository) -> Result<Credential, CredentialError> {
        let slug = repository.slug();
        let url = self.token_url(&repository.owner, &repository.name);
        tracing::debug!("POST {url}");

        let result = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_token))
            .set("Accept", "application/vnd.github.v3+json")
            .call();

        let response = match result {
            Ok(response) if response.status() == 201 => response,
            Ok(response) => {
                let status = response.status();
                return Err(CredentialError::Rejected {
                    repository: slug,
                    status,
                    body: response.into_string().unwrap_or_default(),
                });
            }
            Err(ureq::Error::Status(status, response)) => {
                return Err(CredentialError::Rejected {
                    repository: slug,
                    status,
                    body: response.into_string().unwrap_or_default(),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(CredentialError::Transport {
                    repository: slug,
                    source: Box::new(transport),
                });
            }
        };

        response
            .into_json::<Credential>()
            .map_err(|e| CredentialError::Decode {
                repository: slug,
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_url_is_scoped_to_repository() {
        let client = GithubClient::with_api_url("pat", "https://ghe.example.com/api/v3/");
        assert_eq!(
            client.token_url("acme", "widgets"),
            "https://ghe.example.com/api/v3/repos/acme/widgets/actions/runners/registration-token"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let credential = Credential {
            token: "AABBCC".to_string(),
            expires_at: Utc::now(),
        };
        let shown = format!("{credential:?}");
        assert!(!shown.contains("AABBCC"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn decodes_api_payload() {
        let credential: Credential = serde_json::from_str(
            r#"{"token":"LLBF3JGZDX3P5PMEXLND6TS6FCWO6","expires_at":"2020-01-22T12:13:35.123-08:00"}"#,
        )
        .expect("decode");
        assert_eq!(credential.token, "LLBF3JGZDX3P5PMEXLND6TS6FCWO6");
    }
}
