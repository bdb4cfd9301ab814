//! Per-volume-path lock table.
//!
//! Ledger mutations are read-modify-write sequences on a shared file;
//! two concurrent adds can both see an id absent, and a concurrent
//! truncate-and-rewrite can silently drop another writer's line. Every
//! lifecycle operation that touches a volume's ledger or directory holds
//! that volume's lock for the whole span.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Lock arena keyed by normalized volume path, created on demand.
#[derive(Default)]
pub struct PathLocks {
    table: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a volume path.
    pub fn acquire(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut table = self.table.lock();
        table.entry(path.to_path_buf()).or_default().clone()
    }

    /// Drop the table entry for a removed volume.
    ///
    /// Only safe once no in-flight operation holds a handle: a holder
    /// still referencing the old lock would otherwise race a fresh one.
    pub fn forget(&self, path: &Path) {
        let mut table = self.table.lock();
        if let Some(lock) = table.get(path) {
            if Arc::strong_count(lock) == 1 {
                table.remove(path);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_yields_same_lock() {
        let locks = PathLocks::new();
        let a = locks.acquire(Path::new("/mnt/vol1"));
        let b = locks.acquire(Path::new("/mnt/vol1"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_distinct_paths_do_not_contend() {
        let locks = PathLocks::new();
        let a = locks.acquire(Path::new("/mnt/vol1"));
        let b = locks.acquire(Path::new("/mnt/vol2"));

        let _ga = a.lock();
        // Would deadlock if vol2 shared vol1's mutex.
        let _gb = b.lock();
    }

    #[test]
    fn test_forget_only_drops_unreferenced_entries() {
        let locks = PathLocks::new();
        let held = locks.acquire(Path::new("/mnt/vol1"));

        locks.forget(Path::new("/mnt/vol1"));
        assert_eq!(locks.len(), 1, "held lock must survive forget");

        drop(held);
        locks.forget(Path::new("/mnt/vol1"));
        assert_eq!(locks.len(), 0);
    }
}
