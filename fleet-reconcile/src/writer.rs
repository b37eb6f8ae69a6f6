//! Hash-gated atomic manifest writer.
//!
//! ## `write_manifest` protocol
//!
//! 1. Normalise line endings to LF.
//! 2. SHA-256 hash the content.
//! 3. Hash the file currently on disk, if any; skip if identical.
//! 4. Write to `<path>.tmp`.
//! 5. Rename to the final path (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{persist_err, ReconcileError};

/// Outcome of a manifest write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf, digest: String },
    /// File was left alone; its content already matches.
    Unchanged { path: PathBuf, digest: String },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path, .. } | WriteResult::Unchanged { path, .. } => path,
        }
    }

    /// Hex SHA-256 of the manifest content now on disk.
    pub fn digest(&self) -> &str {
        match self {
            WriteResult::Written { digest, .. } | WriteResult::Unchanged { digest, .. } => digest,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }
}

pub fn digest(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    hex::encode(h.finalize())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.tmp", path.display()))
}

/// Atomically write the manifest at `path`.
pub fn write_manifest(path: &Path, content: &str) -> Result<WriteResult, ReconcileError> {
    write_manifest_with_tmp(path, content, &tmp_path(path))
}

fn write_manifest_with_tmp(
    path: &Path,
    content: &str,
    tmp: &Path,
) -> Result<WriteResult, ReconcileError> {
    let normalized = content.replace("\r\n", "\n");
    let hash = digest(&normalized);

    match std::fs::read_to_string(path) {
        Ok(existing) if digest(&existing) == hash => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
                digest: hash,
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        // Unreadable or non-UTF-8 content is simply replaced.
        Err(e) => tracing::debug!("cannot compare {}: {e}", path.display()),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| persist_err(parent, e))?;
    }
    std::fs::write(tmp, &normalized).map_err(|e| persist_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(persist_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
        digest: hash,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_write_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docker-compose.yml");
        let result = write_manifest(&path, "services: {}\n").unwrap();
        assert!(result.is_written());
        assert_eq!(fs::read_to_string(&path).unwrap(), "services: {}\n");
        assert_eq!(result.digest(), digest("services: {}\n"));
    }

    #[test]
    fn same_content_is_unchanged_and_mtime_kept() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docker-compose.yml");
        write_manifest(&path, "same").unwrap();

        let old = FileTime::from_unix_time(1_000_000, 0);
        filetime::set_file_mtime(&path, old).unwrap();

        let result = write_manifest(&path, "same").unwrap();
        assert!(matches!(result, WriteResult::Unchanged { .. }));
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&path).unwrap());
        assert_eq!(mtime, old, "unchanged manifest must not be rewritten");
    }

    #[test]
    fn changed_content_returns_written() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docker-compose.yml");
        let first = write_manifest(&path, "v1").unwrap();
        let second = write_manifest(&path, "v2").unwrap();
        assert!(second.is_written());
        assert_ne!(first.digest(), second.digest());
    }

    #[test]
    fn crlf_and_lf_content_share_the_same_hash() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docker-compose.yml");
        assert!(write_manifest(&path, "a\r\nb\r\n").unwrap().is_written());
        let second = write_manifest(&path, "a\nb\n").unwrap();
        assert!(!second.is_written());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docker-compose.yml");
        write_manifest(&path, "data").unwrap();
        assert!(!tmp_path(&path).exists(), ".tmp must be cleaned up");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deploy").join("docker-compose.yml");
        write_manifest(&path, "content").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn rename_failure_cleans_tmp() {
        let root = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let path = root.path().join("docker-compose.yml");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp = tmp_dir.path().join("docker-compose.yml.tmp");
        let err = write_manifest_with_tmp(&path, "new content", &tmp);

        assert!(matches!(err, Err(ReconcileError::Persist { .. })));
        assert!(path.join("occupied").is_dir());
        assert!(!tmp.exists(), ".tmp should be cleaned up");
    }
}
