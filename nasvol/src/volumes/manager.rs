//! Volume lifecycle orchestration.
//!
//! Validates names first, resolves paths second, and serializes every
//! ledger or directory mutation on the per-volume lock. All filesystem
//! errors propagate verbatim; nothing is retried or rolled back.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::errors::{NasvolError, NasvolResult};
use crate::volumes::ledger;
use crate::volumes::locks::PathLocks;
use crate::volumes::name::is_valid_name;
use crate::volumes::ownership::{self, OwnershipImpl};
use crate::volumes::paths::MountPoint;

/// Scope advertised by capabilities: a volume is visible and usable from
/// any host sharing the mount point.
pub const SCOPE_GLOBAL: &str = "global";

/// Descriptor returned by get and list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub name: String,
    pub path: PathBuf,
}

/// Manager for directory-backed volumes under one mount point.
///
/// Cheap to share behind an `Arc`; all interior state is the lock table,
/// which has its own synchronization. A single manager process is assumed
/// to own the mount point — there is no cross-process locking.
pub struct VolumeManager {
    mount_point: MountPoint,
    locks: PathLocks,
    ownership: Box<dyn OwnershipImpl>,
}

impl VolumeManager {
    /// Create a manager over a raw mount point string.
    ///
    /// The mount point is normalized once here and never changes.
    pub fn new(raw_mount_point: &str) -> Self {
        Self {
            mount_point: MountPoint::new(raw_mount_point),
            locks: PathLocks::new(),
            ownership: ownership::platform_ownership(),
        }
    }

    /// The normalized base directory volumes live under.
    pub fn mount_point(&self) -> &MountPoint {
        &self.mount_point
    }

    /// Provision a volume directory.
    ///
    /// Creates the directory with owner-only permissions, applies the
    /// uid/gid from `options` when non-default, and initializes the track
    /// file. Calling create for an existing volume directory succeeds
    /// without re-checking ownership. A failed ownership assignment
    /// leaves the directory in place: the volume is created but
    /// misconfigured, and the error still propagates.
    pub fn create(&self, name: &str, options: &HashMap<String, String>) -> NasvolResult<()> {
        if !is_valid_name(name) {
            return Err(NasvolError::InvalidName(name.to_string()));
        }
        let path = self.mount_point.volume_path(name);
        let lock = self.locks.acquire(&path);
        let _guard = lock.lock();

        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {
                tracing::debug!(volume = name, "volume already exists, create is a no-op");
                return Ok(());
            }
            Ok(_) => return Err(NasvolError::NotADirectory(path)),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&path)?;

        let (uid, gid) = ownership::owner_from_options(options);
        if (uid, gid) != (0, 0) {
            if let Err(e) = self.ownership.apply(&path, uid, gid) {
                tracing::error!(
                    volume = name,
                    uid,
                    gid,
                    error = %e,
                    "directory created but ownership assignment failed"
                );
                return Err(e);
            }
        }

        ledger::ensure(&path)?;
        tracing::debug!(volume = name, path = %path.display(), "volume created");
        Ok(())
    }

    /// Enumerate volumes under the mount point.
    ///
    /// Only directories whose names pass the grammar are volumes. Each
    /// one gets its track file verified (and created if a volume appeared
    /// out-of-band); entries whose track file cannot be verified are
    /// skipped with a warning rather than failing the listing.
    pub fn list(&self) -> NasvolResult<Vec<VolumeInfo>> {
        let mut volumes = Vec::new();
        for entry in fs::read_dir(self.mount_point.base())? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !is_valid_name(name) {
                continue;
            }
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            if let Err(e) = ledger::ensure(&path) {
                tracing::warn!(
                    volume = name,
                    error = %e,
                    "skipping volume whose track file cannot be verified"
                );
                continue;
            }
            volumes.push(VolumeInfo {
                name: name.to_string(),
                path,
            });
        }
        Ok(volumes)
    }

    /// Look up one volume.
    pub fn get(&self, name: &str) -> NasvolResult<VolumeInfo> {
        let path = self.mount_point.checked_volume_path(name)?;
        ledger::ensure(&path)?;
        Ok(VolumeInfo {
            name: name.to_string(),
            path,
        })
    }

    /// Host path of a volume.
    pub fn path(&self, name: &str) -> NasvolResult<PathBuf> {
        let path = self.mount_point.checked_volume_path(name)?;
        ledger::ensure(&path)?;
        Ok(path)
    }

    /// Delete a volume directory and its ledger.
    ///
    /// Refused while any mount request still holds the volume.
    pub fn remove(&self, name: &str) -> NasvolResult<()> {
        let path = self.mount_point.checked_volume_path(name)?;
        let lock = self.locks.acquire(&path);
        {
            let _guard = lock.lock();
            ledger::ensure(&path)?;
            if !ledger::is_empty(&path)? {
                return Err(NasvolError::VolumeNotEmpty(name.to_string()));
            }
            fs::remove_dir_all(&path)?;
            tracing::debug!(volume = name, path = %path.display(), "volume removed");
        }
        drop(lock);
        self.locks.forget(&path);
        Ok(())
    }

    /// Register a mount request against a volume; returns the host path.
    ///
    /// Safe to call repeatedly with the same id.
    pub fn mount(&self, name: &str, id: &str) -> NasvolResult<PathBuf> {
        let path = self.mount_point.checked_volume_path(name)?;
        let lock = self.locks.acquire(&path);
        let _guard = lock.lock();
        ledger::add(&path, id)?;
        tracing::debug!(volume = name, id, "mount request recorded");
        Ok(path)
    }

    /// Release a mount request.
    ///
    /// Detach is best-effort: an id that was never recorded is logged and
    /// still succeeds.
    pub fn unmount(&self, name: &str, id: &str) -> NasvolResult<()> {
        let path = self.mount_point.checked_volume_path(name)?;
        let lock = self.locks.acquire(&path);
        let _guard = lock.lock();
        if ledger::remove(&path, id)? {
            tracing::debug!(volume = name, id, "mount request released");
        } else {
            tracing::warn!(volume = name, id, "unmount for an id that was never tracked, ignoring");
        }
        Ok(())
    }

    /// Scope descriptor for the capabilities query.
    pub fn capabilities(&self) -> &'static str {
        SCOPE_GLOBAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_manager() -> (TempDir, VolumeManager) {
        let tmp = TempDir::new().unwrap();
        let manager = VolumeManager::new(tmp.path().to_str().unwrap());
        (tmp, manager)
    }

    #[test]
    fn test_create_then_get_round_trip() {
        let (tmp, manager) = test_manager();
        manager.create("vol-1.data", &HashMap::new()).unwrap();

        let info = manager.get("vol-1.data").unwrap();
        assert_eq!(info.name, "vol-1.data");
        assert_eq!(info.path, tmp.path().join("vol-1.data"));
        assert!(info.path.is_dir());
    }

    #[test]
    fn test_create_is_idempotent() {
        let (tmp, manager) = test_manager();
        manager.create("data", &HashMap::new()).unwrap();
        manager.create("data", &HashMap::new()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_create_rejects_invalid_name_before_touching_fs() {
        let (tmp, manager) = test_manager();
        match manager.create("bad/name", &HashMap::new()) {
            Err(NasvolError::InvalidName(_)) => {}
            other => panic!("expected InvalidName, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_fails_on_name_collision_with_file() {
        let (tmp, manager) = test_manager();
        std::fs::write(tmp.path().join("stray"), b"file").unwrap();
        match manager.create("stray", &HashMap::new()) {
            Err(NasvolError::NotADirectory(_)) => {}
            other => panic!("expected NotADirectory, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_create_restricts_directory_to_owner() {
        use std::os::unix::fs::PermissionsExt;
        let (tmp, manager) = test_manager();
        manager.create("data", &HashMap::new()).unwrap();
        let mode = std::fs::metadata(tmp.path().join("data"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_remove_gated_on_ledger_then_succeeds_after_unmount() {
        let (tmp, manager) = test_manager();
        manager.create("data", &HashMap::new()).unwrap();
        manager.mount("data", "req1").unwrap();

        match manager.remove("data") {
            Err(NasvolError::VolumeNotEmpty(name)) => assert_eq!(name, "data"),
            other => panic!("expected VolumeNotEmpty, got {other:?}"),
        }

        manager.unmount("data", "req1").unwrap();
        manager.remove("data").unwrap();
        assert!(!tmp.path().join("data").exists());
    }

    #[test]
    fn test_mount_returns_path_and_is_idempotent() {
        let (tmp, manager) = test_manager();
        manager.create("data", &HashMap::new()).unwrap();

        let first = manager.mount("data", "req1").unwrap();
        let second = manager.mount("data", "req1").unwrap();
        assert_eq!(first, tmp.path().join("data"));
        assert_eq!(first, second);

        // Still removable after releasing the single logical attach.
        manager.unmount("data", "req1").unwrap();
        manager.remove("data").unwrap();
    }

    #[test]
    fn test_unmount_of_unknown_id_succeeds() {
        let (_tmp, manager) = test_manager();
        manager.create("data", &HashMap::new()).unwrap();
        manager.unmount("data", "never-added").unwrap();
        manager.remove("data").unwrap();
    }

    #[test]
    fn test_operations_on_missing_volume_fail() {
        let (_tmp, manager) = test_manager();
        assert!(matches!(manager.get("absent"), Err(NasvolError::PathNotFound(_))));
        assert!(matches!(manager.path("absent"), Err(NasvolError::PathNotFound(_))));
        assert!(matches!(
            manager.mount("absent", "req1"),
            Err(NasvolError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_list_filters_invalid_names_and_self_heals_ledgers() {
        let (tmp, manager) = test_manager();
        manager.create("good-volume", &HashMap::new()).unwrap();

        // A volume created out-of-band, with no track file yet.
        std::fs::create_dir(tmp.path().join("imported")).unwrap();
        // Noise that must not show up: bad name, plain file.
        std::fs::create_dir(tmp.path().join(".hidden")).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let mut names: Vec<_> = manager.list().unwrap().into_iter().map(|v| v.name).collect();
        names.sort();
        assert_eq!(names, vec!["good-volume", "imported"]);
        assert!(tmp.path().join("imported").join(".track").is_file());
    }

    #[test]
    fn test_concurrent_mounts_lose_no_update() {
        let (_tmp, manager) = test_manager();
        manager.create("data", &HashMap::new()).unwrap();
        let manager = Arc::new(manager);

        let handles: Vec<_> = ["A", "B"]
            .into_iter()
            .map(|id| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || manager.mount("data", id).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let path = manager.get("data").unwrap().path;
        let mut ids = ledger::active_ids(&path).unwrap();
        ids.sort();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_concurrent_mount_and_unmount_keep_other_id() {
        let (_tmp, manager) = test_manager();
        manager.create("data", &HashMap::new()).unwrap();
        manager.mount("data", "stay").unwrap();
        manager.mount("data", "go").unwrap();
        let manager = Arc::new(manager);

        let m1 = Arc::clone(&manager);
        let t1 = std::thread::spawn(move || m1.mount("data", "new").unwrap());
        let m2 = Arc::clone(&manager);
        let t2 = std::thread::spawn(move || m2.unmount("data", "go").unwrap());
        t1.join().unwrap();
        t2.join().unwrap();

        let path = manager.get("data").unwrap().path;
        let mut ids = ledger::active_ids(&path).unwrap();
        ids.sort();
        assert_eq!(ids, vec!["new", "stay"]);
    }

    #[test]
    fn test_capabilities_scope_is_global() {
        let (_tmp, manager) = test_manager();
        assert_eq!(manager.capabilities(), SCOPE_GLOBAL);
    }
}
