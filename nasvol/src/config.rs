//! Daemon configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Plugin name; the driver registration and the socket file derive from it.
pub const PLUGIN_NAME: &str = "nasvol";

/// Directory where Docker discovers plugin sockets.
pub const PLUGIN_SOCKET_DIR: &str = "/run/docker/plugins";

/// How the daemon accepts plugin requests.
#[derive(Debug, Clone)]
pub enum Listener {
    /// Unix socket under the Docker plugin directory (the default).
    Socket(PathBuf),
    /// Loopback TCP, for hosts without Unix sockets.
    Tcp(SocketAddr),
}

/// Validated daemon options, built once from CLI flags.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Base mount point volumes are created under (raw; the engine
    /// normalizes it).
    pub mount_point: String,
    pub listener: Listener,
    pub verbose: bool,
}

impl DaemonOptions {
    /// Socket path Docker expects for this plugin.
    pub fn default_socket_path() -> PathBuf {
        PathBuf::from(PLUGIN_SOCKET_DIR).join(format!("{PLUGIN_NAME}.sock"))
    }
}
