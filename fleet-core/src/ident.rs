//! Identifier allocation: work directories, anchors, service names and the
//! derived repository identity.
//!
//! Everything here is pure except [`short_id`], which draws from the thread
//! RNG. Allocation functions take the set of already-used values and insert
//! what they hand out, so a caller can allocate a batch against one set.

use std::collections::HashSet;
use std::fmt;

use rand::Rng;

use crate::error::RosterError;
use crate::types::{AnchorName, ServiceName};

/// Directory every runner work dir lives under. Mounted into each container.
pub const RUNNER_ROOT: &str = "/tmp/runner";

/// Suffix appended to a normalised repository name to form its anchor.
pub const ANCHOR_SUFFIX: &str = "-api-env";

/// Host used for clone URLs.
pub const GITHUB_WEB: &str = "https://github.com";

/// Length of generated ids. With a 64-symbol alphabet this gives 126 bits.
pub const ID_LEN: usize = 21;

const ALPHABET: &[u8] = b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const REF_PREFIXES: &[&str] = &["https://github.com/", "http://github.com/", "github.com/"];

// ---------------------------------------------------------------------------
// Work directories
// ---------------------------------------------------------------------------

/// Random filesystem-safe id drawn from `A-Za-z0-9_-`.
pub fn short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// `<RUNNER_ROOT>/<id>` not yet present in `existing`; the result is inserted.
pub fn unique_work_dir(existing: &mut HashSet<String>) -> String {
    unique_work_dir_with(existing, short_id)
}

/// [`unique_work_dir`] with an injectable id source.
pub fn unique_work_dir_with(
    existing: &mut HashSet<String>,
    mut next_id: impl FnMut() -> String,
) -> String {
    loop {
        let dir = format!("{RUNNER_ROOT}/{}", next_id());
        if existing.insert(dir.clone()) {
            return dir;
        }
    }
}

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

/// Lower-case, strip separators (`-`, `_`, `.`), append [`ANCHOR_SUFFIX`].
///
/// Only ASCII alphanumerics survive, which keeps the result a valid YAML
/// anchor for libyaml-based parsers. Distinct names can normalise to the
/// same anchor (`my-repo` / `my_repo`); use [`unique_anchor_name`] when
/// allocating for a roster.
pub fn anchor_name(repository_name: &str) -> AnchorName {
    let normalized: String = repository_name
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    AnchorName(format!("{normalized}{ANCHOR_SUFFIX}"))
}

/// [`anchor_name`], suffixed `-2`, `-3`, ... until absent from `existing`.
pub fn unique_anchor_name(repository_name: &str, existing: &mut HashSet<String>) -> AnchorName {
    let base = anchor_name(repository_name);
    if existing.insert(base.0.clone()) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{}-{n}", base.0);
        if existing.insert(candidate.clone()) {
            return AnchorName(candidate);
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Service names
// ---------------------------------------------------------------------------

/// Service and runner names for runner `index` (1-based) of `owner/name`.
///
/// Prefers `{name}-runner-{i}`; falls back to an owner-qualified name when a
/// same-named repository of another owner already holds it.
pub fn unique_service(
    owner: &str,
    name: &str,
    index: usize,
    taken: &mut HashSet<String>,
) -> (ServiceName, String) {
    let candidates = [
        (format!("{name}-runner-{index}"), format!("{name}-{index}")),
        (
            format!("{owner}-{name}-runner-{index}"),
            format!("{owner}-{name}-{index}"),
        ),
    ];
    for (service, runner) in candidates {
        if taken.insert(service.clone()) {
            return (ServiceName(service), runner);
        }
    }
    let mut n = 2usize;
    loop {
        let service = format!("{owner}-{name}-runner-{index}-{n}");
        if taken.insert(service.clone()) {
            return (ServiceName(service), format!("{owner}-{name}-{index}-{n}"));
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Derived identity of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub full_name: String,
    pub url: String,
}

pub fn derive_identity(owner: &str, name: &str) -> Identity {
    Identity {
        full_name: format!("{owner}/{name}"),
        url: format!("{GITHUB_WEB}/{owner}/{name}"),
    }
}

/// A parsed `owner/name` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// GitHub owner and repository names: `[A-Za-z0-9._-]+`, never `.` or `..`.
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Parse `owner/repo`, `github.com/owner/repo` or `https://github.com/owner/repo`.
///
/// A trailing `/` or `.git` is tolerated. Both segments must be valid GitHub
/// names, which also keeps derived service names safe as YAML keys.
pub fn parse_repo_ref(input: &str) -> Result<RepoRef, RosterError> {
    let trimmed = input.trim();
    let mut rest = trimmed;
    for prefix in REF_PREFIXES {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    match rest.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if is_valid_segment(owner) && is_valid_segment(name) => Ok(RepoRef {
            owner: (*owner).to_string(),
            name: (*name).to_string(),
        }),
        _ => Err(RosterError::InvalidRepoRef {
            input: trimmed.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_name_normalises() {
        assert_eq!(anchor_name("My-Repo_1").0, "myrepo1-api-env");
        assert_eq!(anchor_name("toolbox").0, "toolbox-api-env");
        assert_eq!(anchor_name("site.github.io").0, "sitegithubio-api-env");
    }

    #[test]
    fn unique_anchor_name_suffixes_collisions() {
        let mut used = HashSet::new();
        assert_eq!(unique_anchor_name("my-repo", &mut used).0, "myrepo-api-env");
        assert_eq!(unique_anchor_name("my_repo", &mut used).0, "myrepo-api-env-2");
        assert_eq!(unique_anchor_name("MyRepo", &mut used).0, "myrepo-api-env-3");
    }

    #[test]
    fn short_id_uses_safe_alphabet() {
        let id = short_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn unique_work_dir_retries_on_collision() {
        let mut used = HashSet::from([format!("{RUNNER_ROOT}/taken")]);
        let mut ids = vec!["fresh", "taken", "taken"];
        let dir = unique_work_dir_with(&mut used, || ids.pop().unwrap().to_string());
        assert_eq!(dir, format!("{RUNNER_ROOT}/fresh"));
        assert!(ids.is_empty(), "generator must be polled until a free id appears");
        assert!(used.contains(&dir));
    }

    #[test]
    fn unique_work_dir_never_repeats() {
        let mut used = HashSet::new();
        let dirs: Vec<String> = (0..500).map(|_| unique_work_dir(&mut used)).collect();
        let distinct: HashSet<&String> = dirs.iter().collect();
        assert_eq!(distinct.len(), 500);
        assert!(dirs.iter().all(|d| d.starts_with("/tmp/runner/")));
    }

    #[test]
    fn unique_service_falls_back_to_owner_prefix() {
        let mut taken = HashSet::new();
        let (a, _) = unique_service("acme", "api", 1, &mut taken);
        let (b, runner) = unique_service("globex", "api", 1, &mut taken);
        assert_eq!(a.0, "api-runner-1");
        assert_eq!(b.0, "globex-api-runner-1");
        assert_eq!(runner, "globex-api-1");
    }

    #[test]
    fn derive_identity_composes_strings() {
        let id = derive_identity("acme", "widgets");
        assert_eq!(id.full_name, "acme/widgets");
        assert_eq!(id.url, "https://github.com/acme/widgets");
        assert_eq!(id, derive_identity("acme", "widgets"));
    }

    #[test]
    fn parse_accepts_known_forms() {
        for input in [
            "acme/widgets",
            "github.com/acme/widgets",
            "https://github.com/acme/widgets",
            "https://github.com/acme/widgets.git",
            " acme/widgets/ ",
        ] {
            let r = parse_repo_ref(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(r.owner, "acme");
            assert_eq!(r.name, "widgets");
        }
    }

    #[test]
    fn parse_keeps_dots_and_underscores() {
        let r = parse_repo_ref("my-org/site.github.io").unwrap();
        assert_eq!(r.name, "site.github.io");
        let r = parse_repo_ref("acme/my_repo-2").unwrap();
        assert_eq!(r.name, "my_repo-2");
    }

    #[test]
    fn parse_rejects_malformed() {
        for input in [
            "not-a-valid-ref",
            "a/b/c",
            "/widgets",
            "acme/",
            "",
            "acme/we b #x",
            "acme/x:y",
            "ac me/widgets",
            "acme/..",
        ] {
            let err = parse_repo_ref(input).unwrap_err();
            assert!(matches!(err, RosterError::InvalidRepoRef { .. }), "{input}");
        }
    }
}
