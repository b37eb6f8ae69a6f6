//! Timestamped copies of the previous manifest.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::ReconcileError;

/// `<manifest>.backup.<unix-seconds>`.
pub fn backup_path(manifest: &Path, at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("{}.backup.{}", manifest.display(), at.timestamp()))
}

/// Copy `manifest` aside if it exists. Returns the backup path, or `None`
/// when there was nothing to back up.
pub fn backup_manifest(
    manifest: &Path,
    at: DateTime<Utc>,
) -> Result<Option<PathBuf>, ReconcileError> {
    if !manifest.is_file() {
        return Ok(None);
    }
    let target = backup_path(manifest, at);
    std::fs::copy(manifest, &target).map_err(|source| ReconcileError::Backup {
        path: target.clone(),
        source,
    })?;
    tracing::info!("backed up {} to {}", manifest.display(), target.display());
    Ok(Some(target))
}
