//! Per-run credential refresh across the whole roster.

use fleet_core::{ident::derive_identity, types::Roster};

use crate::client::CredentialSource;
use crate::error::CredentialError;

/// Recompute derived identity and fetch a fresh token for every repository,
/// in roster order.
///
/// Fail-fast: the first error is returned and later repositories are not
/// contacted. Returns the number of repositories refreshed.
pub fn refresh_all(
    roster: &mut Roster,
    source: &dyn CredentialSource,
) -> Result<usize, CredentialError> {
    for repo in roster.repositories.iter_mut() {
        let identity = derive_identity(&repo.owner, &repo.name);
        repo.full_name = identity.full_name;
        repo.url = identity.url;

        tracing::info!("fetching token for {}...", repo.full_name);
        let credential = source.fetch(repo)?;
        tracing::info!(
            "token obtained for {} (expires {})",
            repo.full_name,
            credential.expires_at.to_rfc3339()
        );
        repo.token = credential.token;
    }
    Ok(roster.repositories.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use chrono::Utc;
    use fleet_core::{roster::add_repository, types::Repository};

    use crate::client::Credential;

    /// Issues `tok-<name>` and fails for names listed in `failing`.
    struct ScriptedSource {
        failing: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(failing: Vec<&'static str>) -> Self {
            ScriptedSource {
                failing,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CredentialSource for ScriptedSource {
        fn fetch(&self, repository: &Repository) -> Result<Credential, CredentialError> {
            self.calls.borrow_mut().push(repository.slug());
            if self.failing.contains(&repository.name.as_str()) {
                return Err(CredentialError::Rejected {
                    repository: repository.slug(),
                    status: 401,
                    body: r#"{"message":"Bad credentials"}"#.to_string(),
                });
            }
            Ok(Credential {
                token: format!("tok-{}", repository.name),
                expires_at: Utc::now(),
            })
        }
    }

    fn roster(names: &[&str]) -> Roster {
        let mut roster = Roster::default();
        for name in names {
            add_repository(&mut roster, &format!("acme/{name}"), 1).expect("add");
        }
        roster
    }

    #[test]
    fn every_repository_gets_a_token_and_identity() {
        let mut roster = roster(&["a", "b"]);
        for repo in roster.repositories.iter_mut() {
            repo.full_name.clear();
            repo.url = "stale".to_string();
        }
        let source = ScriptedSource::new(vec![]);

        let refreshed = refresh_all(&mut roster, &source).expect("refresh");
        assert_eq!(refreshed, 2);
        assert_eq!(roster.repositories[0].token, "tok-a");
        assert_eq!(roster.repositories[1].token, "tok-b");
        assert_eq!(roster.repositories[1].full_name, "acme/b");
        assert_eq!(roster.repositories[1].url, "https://github.com/acme/b");
    }

    #[test]
    fn first_failure_aborts_remaining_repositories() {
        let mut roster = roster(&["a", "b", "c"]);
        let source = ScriptedSource::new(vec!["b"]);

        let err = refresh_all(&mut roster, &source).unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(*source.calls.borrow(), vec!["acme/a", "acme/b"]);
        assert!(roster.repositories[2].token.is_empty());
    }
}
