//! Bootstrap rosters used when no roster file exists yet.
//!
//! The store asks a [`DefaultRoster`] provider instead of embedding
//! organisation-specific data. [`SeedList`] expands a list of
//! `(owner, name, runner_count)` seeds into a full roster: runners are
//! numbered globally (`service-1`, `runner-1`, ...) and every work dir is
//! allocated from one shared used-set.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, RosterError};
use crate::ident::{derive_identity, unique_anchor_name, unique_work_dir};
use crate::types::{AnchorName, Repository, Roster, Runner, ServiceName};

/// Supplies the roster used when the roster file is absent.
pub trait DefaultRoster {
    fn default_roster(&self) -> Roster;
}

impl<F> DefaultRoster for F
where
    F: Fn() -> Roster,
{
    fn default_roster(&self) -> Roster {
        self()
    }
}

/// One repository to bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSeed {
    pub owner: String,
    pub name: String,
    /// Explicit anchor; derived from `name` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_name: Option<String>,
    #[serde(default = "default_runner_count")]
    pub runner_count: usize,
}

fn default_runner_count() -> usize {
    1
}

/// A fixed list of seeds, expanded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedList(pub Vec<RepoSeed>);

impl SeedList {
    /// Built-in single-repository seed.
    pub fn builtin() -> Self {
        SeedList(vec![RepoSeed {
            owner: "octo-org".to_string(),
            name: "octo-repo".to_string(),
            anchor_name: None,
            runner_count: 2,
        }])
    }

    /// Load seeds from a JSON array file.
    pub fn from_file(path: &Path) -> Result<Self, RosterError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let seeds: Vec<RepoSeed> =
            serde_json::from_str(&contents).map_err(|e| RosterError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        if let Some(bad) = seeds.iter().find(|s| s.runner_count == 0) {
            return Err(RosterError::InvalidRunnerCount(bad.runner_count));
        }
        Ok(SeedList(seeds))
    }

    /// Expand the seeds into a roster.
    pub fn generate(&self) -> Roster {
        let mut work_dirs = HashSet::new();
        let mut anchors = HashSet::new();
        let mut counter = 1usize;

        let repositories = self
            .0
            .iter()
            .map(|seed| {
                let anchor_name = match &seed.anchor_name {
                    Some(explicit) if anchors.insert(explicit.clone()) => {
                        AnchorName(explicit.clone())
                    }
                    _ => unique_anchor_name(&seed.name, &mut anchors),
                };
                let runners = (0..seed.runner_count)
                    .map(|_| {
                        let runner = Runner {
                            service_name: ServiceName(format!("service-{counter}")),
                            runner_name: format!("runner-{counter}"),
                            work_dir: unique_work_dir(&mut work_dirs),
                        };
                        counter += 1;
                        runner
                    })
                    .collect();
                let identity = derive_identity(&seed.owner, &seed.name);
                Repository {
                    owner: seed.owner.clone(),
                    name: seed.name.clone(),
                    full_name: identity.full_name,
                    url: identity.url,
                    token: String::new(),
                    anchor_name,
                    runners,
                }
            })
            .collect();

        Roster { repositories }
    }
}

impl DefaultRoster for SeedList {
    fn default_roster(&self) -> Roster {
        self.generate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
