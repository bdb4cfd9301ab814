//! Mount point normalization and volume path resolution.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{NasvolError, NasvolResult};
use crate::volumes::name::is_valid_name;

/// Base directory all volumes live under.
///
/// Normalized once at startup and immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct MountPoint {
    base: PathBuf,
}

impl MountPoint {
    /// Normalize a raw mount point: runs of path separators collapse to
    /// one, and a trailing separator is stripped.
    pub fn new(raw: &str) -> Self {
        let mut normalized = String::with_capacity(raw.len());
        let mut prev_sep = false;
        for ch in raw.chars() {
            if ch == '/' {
                if !prev_sep {
                    normalized.push(ch);
                }
                prev_sep = true;
            } else {
                normalized.push(ch);
                prev_sep = false;
            }
        }
        if normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
        Self {
            base: PathBuf::from(normalized),
        }
    }

    /// The normalized base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Join a volume name onto the base. Does not touch the filesystem.
    pub fn volume_path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    /// Validate the name and stat the joined path.
    ///
    /// Fails with [`NasvolError::PathNotFound`] if the volume directory is
    /// absent, or [`NasvolError::NotADirectory`] if a stray non-directory
    /// entry holds the name. Precedes every lifecycle operation except
    /// create and list.
    pub fn checked_volume_path(&self, name: &str) -> NasvolResult<PathBuf> {
        if !is_valid_name(name) {
            return Err(NasvolError::InvalidName(name.to_string()));
        }
        let path = self.volume_path(name);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(path),
            Ok(_) => Err(NasvolError::NotADirectory(path)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(NasvolError::PathNotFound(path)),
            Err(e) => Err(e.into()),
        }
    }
}
