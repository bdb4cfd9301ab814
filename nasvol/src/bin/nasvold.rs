//! Daemon entry point: flag parsing, logging, listener setup.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;

use nasvol::config::{DaemonOptions, Listener, PLUGIN_NAME};
use nasvol::protocol;
use nasvol::volumes::VolumeManager;

#[derive(Debug, Parser)]
#[command(
    name = "nasvold",
    about = "Directory-backed Docker volume plugin for shared NAS mount points"
)]
struct Cli {
    /// Listener kind.
    #[arg(long = "type", value_parser = ["socket", "tcp"], default_value = "socket")]
    listen_type: String,

    /// Port to listen on when the listener kind is tcp.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Base mount point volumes are created under.
    #[arg(long = "sysmp", default_value = "/mnt")]
    mount_point: String,

    /// Print debug output.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.mount_point.is_empty() {
        bail!("a base mount point must be provided");
    }
    let listener = match cli.listen_type.as_str() {
        "tcp" => {
            if cli.port < 1000 {
                bail!("listen port {} cannot be below 1000 (system ports)", cli.port);
            }
            Listener::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, cli.port)))
        }
        _ => Listener::Socket(DaemonOptions::default_socket_path()),
    };
    let options = DaemonOptions {
        mount_point: cli.mount_point,
        listener,
        verbose: cli.verbose,
    };

    let manager = Arc::new(VolumeManager::new(&options.mount_point));
    tracing::info!(
        plugin = PLUGIN_NAME,
        mount_point = %manager.mount_point().base().display(),
        "starting volume plugin"
    );

    match options.listener {
        Listener::Tcp(addr) => protocol::serve_tcp(manager, addr).await?,
        Listener::Socket(path) => {
            #[cfg(unix)]
            protocol::serve_unix(manager, &path).await?;
            #[cfg(not(unix))]
            {
                let _ = (manager, path);
                bail!("unix socket listener is not supported on this platform, use --type tcp");
            }
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
