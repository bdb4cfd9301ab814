//! nasvol: a directory-backed Docker volume plugin.
//!
//! Volumes are plain subdirectories of a configured base mount point,
//! typically a NAS mount shared between hosts. A per-volume track file
//! records which mount requests currently hold the volume and gates
//! removal until the last one is released; see [`volumes`] for the
//! engine and [`protocol`] for the wire surface.

pub mod config;
pub mod errors;
pub mod protocol;
pub mod volumes;

pub use errors::{NasvolError, NasvolResult};
pub use volumes::{VolumeInfo, VolumeManager};
