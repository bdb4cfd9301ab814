//! The track file: per-volume ledger of outstanding mount requests.
//!
//! Each volume directory carries a newline-delimited text file listing
//! the identifiers of mount requests that currently hold the volume. A
//! `#`-prefixed comment line may be written when the file is created
//! lazily; only non-comment lines count as attachments. Mutations are
//! synced to disk before returning so the ledger survives a crash.
//!
//! Callers serialize access per volume path (see [`super::locks`]); the
//! read-modify-write sequences here are not safe under concurrent
//! execution on their own.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::{NasvolError, NasvolResult};

/// File name of the ledger inside each volume directory.
pub const TRACK_FILE: &str = ".track";

// Written once on lazy creation so the file is self-describing; carries
// no attachment meaning.
const SENTINEL: &str = "#unknown volume\n";

fn ledger_io(path: &Path, source: std::io::Error) -> NasvolError {
    NasvolError::Ledger {
        path: path.to_path_buf(),
        source,
    }
}

/// Path of the track file for a volume directory.
pub fn track_path(volume_path: &Path) -> PathBuf {
    volume_path.join(TRACK_FILE)
}

/// Create the track file if missing; return its path. Idempotent.
pub fn ensure(volume_path: &Path) -> NasvolResult<PathBuf> {
    let path = track_path(volume_path);
    match fs::metadata(&path) {
        Ok(_) => Ok(path),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let created = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path);
            match created {
                Ok(mut file) => {
                    file.write_all(SENTINEL.as_bytes())
                        .map_err(|e| ledger_io(&path, e))?;
                    file.sync_all().map_err(|e| ledger_io(&path, e))?;
                    Ok(path)
                }
                // Lost a creation race; the other writer's file is fine.
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(path),
                Err(e) => Err(ledger_io(&path, e)),
            }
        }
        Err(e) => Err(ledger_io(&path, e)),
    }
}

fn read_lines(path: &Path) -> NasvolResult<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| ledger_io(path, e))?;
    Ok(contents.lines().map(str::to_string).collect())
}

/// Identifiers currently holding the volume: every non-empty line that is
/// not a comment.
pub fn active_ids(volume_path: &Path) -> NasvolResult<Vec<String>> {
    let path = ensure(volume_path)?;
    Ok(read_lines(&path)?
        .into_iter()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

/// True iff no mount request holds the volume.
///
/// Counts attachment lines, not bytes, so the creation sentinel never
/// blocks removal.
pub fn is_empty(volume_path: &Path) -> NasvolResult<bool> {
    Ok(active_ids(volume_path)?.is_empty())
}

/// Record `id` as holding the volume.
///
/// Idempotent per id: an identifier already present is left alone. The
/// appended line is synced before returning.
pub fn add(volume_path: &Path, id: &str) -> NasvolResult<()> {
    let path = ensure(volume_path)?;
    if read_lines(&path)?.iter().any(|line| line == id) {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(|e| ledger_io(&path, e))?;
    file.write_all(format!("{id}\n").as_bytes())
        .map_err(|e| ledger_io(&path, e))?;
    file.sync_all().map_err(|e| ledger_io(&path, e))?;
    Ok(())
}

/// Strike `id` from the ledger, rewriting the file without it.
///
/// Removes every matching line in case duplicates ever crept in. Reports
/// whether anything was removed; an identifier that was never present is
/// a no-op, not an error.
pub fn remove(volume_path: &Path, id: &str) -> NasvolResult<bool> {
    let path = ensure(volume_path)?;
    let lines = read_lines(&path)?;
    let kept: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .filter(|line| *line != id)
        .collect();
    if kept.len() == lines.len() {
        return Ok(false);
    }
    let mut contents = kept.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&path)
        .map_err(|e| ledger_io(&path, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| ledger_io(&path, e))?;
    file.sync_all().map_err(|e| ledger_io(&path, e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn volume_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_ensure_is_idempotent_and_writes_sentinel() {
        let dir = volume_dir();
        let path = ensure(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(TRACK_FILE));

        let first = fs::read_to_string(&path).unwrap();
        assert!(first.starts_with('#'));

        // Second call leaves the file untouched.
        ensure(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_sentinel_does_not_count_as_attachment() {
        let dir = volume_dir();
        ensure(dir.path()).unwrap();
        assert!(active_ids(dir.path()).unwrap().is_empty());
        assert!(is_empty(dir.path()).unwrap());
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = volume_dir();
        add(dir.path(), "req1").unwrap();
        add(dir.path(), "req1").unwrap();
        assert_eq!(active_ids(dir.path()).unwrap(), vec!["req1"]);
    }

    #[test]
    fn test_remove_leaves_other_ids() {
        let dir = volume_dir();
        add(dir.path(), "req1").unwrap();
        add(dir.path(), "req2").unwrap();

        assert!(remove(dir.path(), "req1").unwrap());
        assert_eq!(active_ids(dir.path()).unwrap(), vec!["req2"]);
    }

    #[test]
    fn test_remove_of_unknown_id_reports_false() {
        let dir = volume_dir();
        add(dir.path(), "req1").unwrap();

        assert!(!remove(dir.path(), "never-added").unwrap());
        assert_eq!(active_ids(dir.path()).unwrap(), vec!["req1"]);
    }

    #[test]
    fn test_remove_strips_accidental_duplicates() {
        let dir = volume_dir();
        let path = ensure(dir.path()).unwrap();
        fs::write(&path, "#unknown volume\nreq1\nreq1\nreq2\n").unwrap();

        assert!(remove(dir.path(), "req1").unwrap());
        assert_eq!(active_ids(dir.path()).unwrap(), vec!["req2"]);
    }

    #[test]
    fn test_empty_after_last_id_removed() {
        let dir = volume_dir();
        add(dir.path(), "req1").unwrap();
        assert!(!is_empty(dir.path()).unwrap());

        remove(dir.path(), "req1").unwrap();
        assert!(is_empty(dir.path()).unwrap());
    }
}
