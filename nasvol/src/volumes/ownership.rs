//! Ownership assignment for freshly provisioned volume directories.
//!
//! Platform seam with two strategies: POSIX hosts chown the directory to
//! the requested uid/gid, everything else is a no-op and volumes stay
//! owned by the daemon user (effectively 0/0).

use std::collections::HashMap;
use std::path::Path;

use crate::errors::NasvolResult;

/// Strategy for applying an owner to a volume directory.
pub(crate) trait OwnershipImpl: Send + Sync {
    fn apply(&self, path: &Path, uid: u32, gid: u32) -> NasvolResult<()>;
}

#[cfg(unix)]
struct PosixOwnership;

#[cfg(unix)]
impl OwnershipImpl for PosixOwnership {
    fn apply(&self, path: &Path, uid: u32, gid: u32) -> NasvolResult<()> {
        use nix::unistd::{Gid, Uid, chown};

        chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid))).map_err(|e| {
            crate::errors::NasvolError::Ownership {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(not(unix))]
struct NoopOwnership;

#[cfg(not(unix))]
impl OwnershipImpl for NoopOwnership {
    fn apply(&self, _path: &Path, uid: u32, gid: u32) -> NasvolResult<()> {
        tracing::debug!(
            uid,
            gid,
            "ownership assignment is not supported on this platform, leaving the default owner"
        );
        Ok(())
    }
}

/// Select the ownership strategy for this platform.
pub(crate) fn platform_ownership() -> Box<dyn OwnershipImpl> {
    #[cfg(unix)]
    {
        Box::new(PosixOwnership)
    }
    #[cfg(not(unix))]
    {
        Box::new(NoopOwnership)
    }
}

fn parse_id(value: &str) -> u32 {
    match value.parse::<u32>() {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!(value, "uid or gid option must be an integer, defaulting to 0");
            0
        }
    }
}

/// Extract the owning uid/gid from create options.
///
/// Missing or malformed entries default to 0.
pub(crate) fn owner_from_options(options: &HashMap<String, String>) -> (u32, u32) {
    let uid = options.get("uid").map(|v| parse_id(v)).unwrap_or(0);
    let gid = options.get("gid").map(|v| parse_id(v)).unwrap_or(0);
    (uid, gid)
}
