//! Docker volume plugin v1 wire surface.
//!
//! `types` holds the serde request/response shapes; `server` binds each
//! endpoint to the corresponding [`crate::volumes::VolumeManager`]
//! operation and owns the listeners.

pub mod types;

mod server;

#[cfg(unix)]
pub use server::serve_unix;
pub use server::{PLUGIN_CONTENT_TYPE, router, serve_tcp};
