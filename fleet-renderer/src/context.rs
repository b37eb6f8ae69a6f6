//! Template context: serializable rendering payload built from a [`Roster`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use fleet_core::ident::{derive_identity, RUNNER_ROOT};
use fleet_core::types::Roster;

use crate::error::RenderError;

/// Shared runtime options applied to every runner service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOptions {
    pub image: String,
    /// Comma-separated runner labels.
    pub labels: String,
    pub runner_scope: String,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        ManifestOptions {
            image: "myoung34/github-runner:latest".to_string(),
            labels: "linux,x64,gpu".to_string(),
            runner_scope: "repo".to_string(),
        }
    }
}

/// Flat rendering payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestContext {
    pub image: String,
    pub labels: String,
    pub runner_scope: String,
    /// `host:container` bind for the runner root.
    pub runner_volume: String,
    pub repositories: Vec<RepositoryCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryCtx {
    pub full_name: String,
    pub url: String,
    pub anchor_name: String,
    pub token: String,
    pub runners: Vec<RunnerCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerCtx {
    pub service_name: String,
    pub runner_name: String,
    pub work_dir: String,
}

fn is_anchor_safe(anchor: &str) -> bool {
    !anchor.is_empty()
        && anchor
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Service keys are emitted unquoted, so they stay within the container name set.
fn is_service_safe(service: &str) -> bool {
    !service.is_empty()
        && service
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl ManifestContext {
    /// Build a [`ManifestContext`], rejecting rosters that would render an
    /// invalid or ambiguous manifest.
    ///
    /// Full name and URL are derived from owner and name here; whatever the
    /// roster carries in those fields is ignored.
    pub fn from_roster(roster: &Roster, options: &ManifestOptions) -> Result<Self, RenderError> {
        if roster.repositories.is_empty() {
            return Err(RenderError::EmptyRoster);
        }

        let mut anchors: HashMap<&str, String> = HashMap::new();
        let mut services: HashSet<&str> = HashSet::new();
        let mut work_dirs: HashSet<&str> = HashSet::new();
        let mut repositories = Vec::with_capacity(roster.repositories.len());

        for repo in &roster.repositories {
            let identity = derive_identity(&repo.owner, &repo.name);
            let anchor = repo.anchor_name.0.as_str();

            if repo.runners.is_empty() {
                return Err(RenderError::NoRunners {
                    repository: identity.full_name,
                });
            }
            if !is_anchor_safe(anchor) {
                return Err(RenderError::InvalidAnchor {
                    anchor: anchor.to_string(),
                    repository: identity.full_name,
                });
            }
            if let Some(first) = anchors.insert(anchor, identity.full_name.clone()) {
                return Err(RenderError::DuplicateAnchor {
                    anchor: anchor.to_string(),
                    first,
                    second: identity.full_name,
                });
            }
            if repo.token.is_empty() {
                return Err(RenderError::MissingCredential {
                    repository: identity.full_name,
                });
            }

            let mut runners = Vec::with_capacity(repo.runners.len());
            for runner in &repo.runners {
                if !is_service_safe(&runner.service_name.0) {
                    return Err(RenderError::InvalidService {
                        service: runner.service_name.0.clone(),
                    });
                }
                if !services.insert(runner.service_name.0.as_str()) {
                    return Err(RenderError::DuplicateService {
                        service: runner.service_name.0.clone(),
                    });
                }
                if !work_dirs.insert(runner.work_dir.as_str()) {
                    return Err(RenderError::DuplicateWorkDir {
                        work_dir: runner.work_dir.clone(),
                    });
                }
                runners.push(RunnerCtx {
                    service_name: runner.service_name.0.clone(),
                    runner_name: runner.runner_name.clone(),
                    work_dir: runner.work_dir.clone(),
                });
            }

            repositories.push(RepositoryCtx {
                full_name: identity.full_name,
                url: identity.url,
                anchor_name: anchor.to_string(),
                token: repo.token.clone(),
                runners,
            });
        }

        Ok(ManifestContext {
            image: options.image.clone(),
            labels: options.labels.clone(),
            runner_scope: options.runner_scope.clone(),
            runner_volume: format!("{RUNNER_ROOT}:{RUNNER_ROOT}"),
            repositories,
        })
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
