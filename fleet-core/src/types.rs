//! Domain types for the runner roster.
//!
//! The on-disk roster uses PascalCase keys (`Repositories`, `Owner`,
//! `AnchorName`, ...) so files written by earlier tooling keep loading.
//! `FullName`, `URL` and `Token` are part of that shape but are recomputed
//! or refreshed on every run and never trusted from disk.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A compose service key. Unique across the whole roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceName(pub String);

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ServiceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServiceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of the YAML anchor that carries one repository's credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorName(pub String);

impl fmt::Display for AnchorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AnchorName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AnchorName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One self-hosted runner container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Runner {
    pub service_name: ServiceName,
    pub runner_name: String,
    /// Absolute path inside the runner root; globally unique in a roster.
    pub work_dir: String,
}

/// A repository and the runners registered against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Repository {
    pub owner: String,
    pub name: String,
    /// Derived: `owner/name`.
    #[serde(default)]
    pub full_name: String,
    /// Derived: clone URL.
    #[serde(default, rename = "URL")]
    pub url: String,
    /// Registration token; volatile, refreshed every run.
    #[serde(default)]
    pub token: String,
    pub anchor_name: AnchorName,
    #[serde(default)]
    pub runners: Vec<Runner>,
}

impl Repository {
    /// `owner/name`, computed from the authoritative fields.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn is(&self, owner: &str, name: &str) -> bool {
        self.owner == owner && self.name == name
    }
}

/// Root of the roster file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Roster {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

impl Roster {
    /// Sum of runner counts across all repositories.
    pub fn total_runners(&self) -> usize {
        self.repositories.iter().map(|r| r.runners.len()).sum()
    }

    pub fn find(&self, owner: &str, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.is(owner, name))
    }

    pub fn contains(&self, owner: &str, name: &str) -> bool {
        self.find(owner, name).is_some()
    }

    pub fn runners(&self) -> impl Iterator<Item = &Runner> {
        self.repositories.iter().flat_map(|r| r.runners.iter())
    }

    pub fn work_dirs(&self) -> HashSet<String> {
        self.runners().map(|r| r.work_dir.clone()).collect()
    }

    pub fn service_names(&self) -> HashSet<String> {
        self.runners().map(|r| r.service_name.0.clone()).collect()
    }

    pub fn anchor_names(&self) -> HashSet<String> {
        self.repositories
            .iter()
            .map(|r| r.anchor_name.0.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
