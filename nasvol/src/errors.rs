//! Crate-wide error types.
//!
//! Every operation in the crate returns [`NasvolResult`]. Errors surface
//! unchanged to the protocol layer, which reports them to the Docker
//! daemon in the `Err` wire field; nothing is retried or rolled back
//! internally.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type NasvolResult<T> = Result<T, NasvolError>;

/// Unified error type for volume operations.
#[derive(Debug, Error)]
pub enum NasvolError {
    /// The volume name fails the name grammar.
    #[error("invalid volume name: {0}")]
    InvalidName(String),

    /// The volume directory does not exist.
    #[error("no volume at {}", .0.display())]
    PathNotFound(PathBuf),

    /// The volume name collides with an entry that is not a directory.
    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Removal was attempted while mount requests still hold the volume.
    #[error("volume {0} still has active mounts")]
    VolumeNotEmpty(String),

    /// A track file read, write, or sync failed.
    #[error("track file {}: {source}", .path.display())]
    Ledger {
        /// Path of the track file involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Ownership assignment failed after the directory was created.
    /// The directory is left in place.
    #[error("could not change owner of {}: {reason}", .path.display())]
    Ownership {
        /// Path of the volume directory.
        path: PathBuf,
        /// Human-readable failure reason.
        reason: String,
    },

    /// Any other filesystem failure (stat, mkdir, recursive delete).
    #[error(transparent)]
    Filesystem(#[from] io::Error),
}
