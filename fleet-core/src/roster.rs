//! Roster store: JSON load / save and repository addition.
//!
//! # Storage
//!
//! One JSON file (default `runners-config.json`). A missing file is not an
//! error: the caller's [`DefaultRoster`] supplies the bootstrap roster.
//! A present but malformed file is fatal.
//!
//! Saves go through a `.tmp` sibling and a rename, mode `0600` on unix.

use std::path::{Path, PathBuf};

use crate::defaults::DefaultRoster;
use crate::error::{io_err, RosterError};
use crate::ident::{
    derive_identity, parse_repo_ref, unique_anchor_name, unique_service, unique_work_dir,
};
use crate::types::{Repository, Roster, Runner};

/// Roster file used when none is given.
pub const DEFAULT_ROSTER_FILE: &str = "runners-config.json";

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Load the roster at `path`, or the provider's default when absent.
///
/// Returns `RosterError::Parse` (with path) if the file is malformed.
pub fn load_at(path: &Path, defaults: &dyn DefaultRoster) -> Result<Roster, RosterError> {
    if !path.exists() {
        tracing::info!("no roster at {}, using defaults", path.display());
        return Ok(defaults.default_roster());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|e| RosterError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// 2. Save (atomic)
// ---------------------------------------------------------------------------

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.tmp", path.display()))
}

/// Atomically save the roster as pretty-printed JSON.
///
/// Write flow: serialize → `.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(path: &Path, roster: &Roster) -> Result<(), RosterError> {
    let json = serde_json::to_string_pretty(roster)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Add repositories
// ---------------------------------------------------------------------------

/// Build a new repository with `runner_count` runners, allocating names and
/// work dirs against everything already in `roster`.
pub fn new_repository(
    roster: &Roster,
    owner: &str,
    name: &str,
    runner_count: usize,
) -> Result<Repository, RosterError> {
    if runner_count == 0 {
        return Err(RosterError::InvalidRunnerCount(runner_count));
    }
    let mut work_dirs = roster.work_dirs();
    let mut services = roster.service_names();
    let mut anchors = roster.anchor_names();

    let runners = (1..=runner_count)
        .map(|i| {
            let (service_name, runner_name) = unique_service(owner, name, i, &mut services);
            Runner {
                service_name,
                runner_name,
                work_dir: unique_work_dir(&mut work_dirs),
            }
        })
        .collect();

    let identity = derive_identity(owner, name);
    Ok(Repository {
        owner: owner.to_string(),
        name: name.to_string(),
        full_name: identity.full_name,
        url: identity.url,
        token: String::new(),
        anchor_name: unique_anchor_name(name, &mut anchors),
        runners,
    })
}

/// Parse `reference` and append it to the roster.
///
/// Rejects duplicates with `RosterError::DuplicateRepository`; the roster is
/// left untouched on any error.
pub fn add_repository<'a>(
    roster: &'a mut Roster,
    reference: &str,
    runner_count: usize,
) -> Result<&'a Repository, RosterError> {
    let parsed = parse_repo_ref(reference)?;
    if roster.contains(&parsed.owner, &parsed.name) {
        return Err(RosterError::DuplicateRepository {
            owner: parsed.owner,
            name: parsed.name,
        });
    }
    let repo = new_repository(roster, &parsed.owner, &parsed.name, runner_count)?;
    let index = roster.repositories.len();
    roster.repositories.push(repo);
    Ok(&roster.repositories[index])
}

/// Outcome of a batch add.
#[derive(Debug, Default)]
pub struct AddSummary {
    /// `owner/name` of every repository appended, in order.
    pub added: Vec<String>,
    /// Entries that were not added, with the reason.
    pub skipped: Vec<(String, RosterError)>,
}

impl AddSummary {
    pub fn changed(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Add every comma-separated entry of `list`. Blank entries are ignored;
/// malformed and duplicate entries are logged and skipped.
pub fn add_repositories(roster: &mut Roster, list: &str, runner_count: usize) -> AddSummary {
    let mut summary = AddSummary::default();

    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match add_repository(roster, entry, runner_count) {
            Ok(repo) => {
                tracing::info!(
                    "added repository {} with {} runners",
                    repo.slug(),
                    repo.runners.len()
                );
                summary.added.push(repo.slug());
            }
            Err(err @ RosterError::DuplicateRepository { .. }) => {
                tracing::info!("{err}");
                summary.skipped.push((entry.to_string(), err));
            }
            Err(err) => {
                tracing::warn!("skipping '{entry}': {err}");
                summary.skipped.push((entry.to_string(), err));
            }
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RosterError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RosterError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
