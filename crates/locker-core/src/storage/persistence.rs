//! Backup file persistence
//!
//! Writes and reads backup documents on the filesystem. Writes are atomic
//! (write to temp file, sync, then rename) so an interrupted backup never
//! leaves a truncated document behind.
//!
//! Storage location: `~/.local/share/bookmark-locker/backups/` (configurable
//! via `Config`)

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::snapshot::{Snapshot, BACKUP_FILE_PREFIX};
use crate::storage::error::{StoreError, StoreResult};

/// Write a snapshot to `path` as a pretty-printed JSON document
pub fn write_backup(path: &Path, snapshot: &Snapshot) -> StoreResult<()> {
    atomic_write(path, snapshot.serialize().as_bytes())
}

/// Read and parse a backup document
pub fn read_backup(path: &Path) -> StoreResult<Snapshot> {
    let text =
        fs::read_to_string(path).map_err(|e| StoreError::from_read_io(e, path.to_path_buf()))?;
    Ok(Snapshot::parse(&text)?)
}

/// Backup files in `dir`, newest first
///
/// A missing directory has no backups.
pub fn list_backups(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::from_read_io(e, dir.to_path_buf())),
    };

    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(BACKUP_FILE_PREFIX))
        })
        .collect();

    // Names embed the epoch millis; compare numerically so widths don't matter.
    backups.sort_by_key(|path| std::cmp::Reverse(backup_millis(path)));
    Ok(backups)
}

fn backup_millis(path: &Path) -> i64 {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.strip_prefix(BACKUP_FILE_PREFIX))
        .and_then(|millis| millis.parse().ok())
        .unwrap_or(0)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
pub fn atomic_write(path: &Path, data: &[u8]) -> StoreResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Create temp file in the same directory (for atomic rename)
    let temp_path = path.with_extension("tmp");

    if let Err(e) = write_synced(&temp_path, data) {
        // Clean up temp file
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::from_io(e, temp_path));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::from_io(e, path.to_path_buf())
    })?;

    Ok(())
}

/// Write `data` to a new file and sync it to disk
fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}
