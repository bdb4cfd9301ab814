//! HTTP surface of the plugin: one POST route per protocol endpoint.
//!
//! Each handler decodes the request, calls the corresponding
//! [`VolumeManager`] operation, and encodes the result. Failures become
//! HTTP 500 with the error's display string in the `Err` field; they are
//! logged here with the volume name and operation, and never abort the
//! daemon.

#[cfg(unix)]
use std::io::ErrorKind;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;

use crate::errors::{NasvolError, NasvolResult};
use crate::protocol::types::{
    ActivateResponse, CapabilitiesResponse, Capability, CreateRequest, EmptyResponse,
    ErrorResponse, GetRequest, GetResponse, ListResponse, MountRequest, MountResponse,
    PathRequest, PathResponse, RemoveRequest, UnmountRequest, VolumeBody,
};
use crate::volumes::VolumeManager;

/// Content type Docker expects from v1 plugins.
pub const PLUGIN_CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1.1+json";

type Manager = Arc<VolumeManager>;

/// Build the plugin router over a shared manager.
pub fn router(manager: Manager) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/VolumeDriver.Create", post(create))
        .route("/VolumeDriver.Remove", post(remove))
        .route("/VolumeDriver.Mount", post(mount))
        .route("/VolumeDriver.Unmount", post(unmount))
        .route("/VolumeDriver.Path", post(path))
        .route("/VolumeDriver.Get", post(get))
        .route("/VolumeDriver.List", post(list))
        .route("/VolumeDriver.Capabilities", post(capabilities))
        .with_state(manager)
}

fn plugin_json<T: serde::Serialize>(status: StatusCode, body: &T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, PLUGIN_CONTENT_TYPE)],
        Json(body),
    )
        .into_response()
}

impl IntoResponse for NasvolError {
    fn into_response(self) -> Response {
        plugin_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorResponse {
                err: self.to_string(),
            },
        )
    }
}

fn log_failure(op: &'static str, volume: &str, err: &NasvolError) {
    tracing::error!(op, volume, error = %err, "volume operation failed");
}

async fn activate() -> Response {
    tracing::debug!("plugin activation handshake");
    plugin_json(StatusCode::OK, &ActivateResponse::volume_driver())
}

async fn create(
    State(manager): State<Manager>,
    Json(req): Json<CreateRequest>,
) -> Result<Response, NasvolError> {
    let opts = req.opts.unwrap_or_default();
    manager.create(&req.name, &opts).map_err(|e| {
        log_failure("create", &req.name, &e);
        e
    })?;
    Ok(plugin_json(StatusCode::OK, &EmptyResponse::default()))
}

async fn remove(
    State(manager): State<Manager>,
    Json(req): Json<RemoveRequest>,
) -> Result<Response, NasvolError> {
    manager.remove(&req.name).map_err(|e| {
        log_failure("remove", &req.name, &e);
        e
    })?;
    Ok(plugin_json(StatusCode::OK, &EmptyResponse::default()))
}

async fn mount(
    State(manager): State<Manager>,
    Json(req): Json<MountRequest>,
) -> Result<Response, NasvolError> {
    let path = manager.mount(&req.name, &req.id).map_err(|e| {
        log_failure("mount", &req.name, &e);
        e
    })?;
    Ok(plugin_json(
        StatusCode::OK,
        &MountResponse {
            mountpoint: path.display().to_string(),
        },
    ))
}

async fn unmount(
    State(manager): State<Manager>,
    Json(req): Json<UnmountRequest>,
) -> Result<Response, NasvolError> {
    manager.unmount(&req.name, &req.id).map_err(|e| {
        log_failure("unmount", &req.name, &e);
        e
    })?;
    Ok(plugin_json(StatusCode::OK, &EmptyResponse::default()))
}

async fn path(
    State(manager): State<Manager>,
    Json(req): Json<PathRequest>,
) -> Result<Response, NasvolError> {
    let path = manager.path(&req.name).map_err(|e| {
        log_failure("path", &req.name, &e);
        e
    })?;
    Ok(plugin_json(
        StatusCode::OK,
        &PathResponse {
            mountpoint: path.display().to_string(),
        },
    ))
}

async fn get(
    State(manager): State<Manager>,
    Json(req): Json<GetRequest>,
) -> Result<Response, NasvolError> {
    let info = manager.get(&req.name).map_err(|e| {
        log_failure("get", &req.name, &e);
        e
    })?;
    Ok(plugin_json(
        StatusCode::OK,
        &GetResponse {
            volume: VolumeBody::from(info),
        },
    ))
}

async fn list(State(manager): State<Manager>) -> Result<Response, NasvolError> {
    let volumes = manager.list().map_err(|e| {
        log_failure("list", "*", &e);
        e
    })?;
    Ok(plugin_json(
        StatusCode::OK,
        &ListResponse {
            volumes: volumes.into_iter().map(VolumeBody::from).collect(),
        },
    ))
}

async fn capabilities(State(manager): State<Manager>) -> Response {
    plugin_json(
        StatusCode::OK,
        &CapabilitiesResponse {
            capabilities: Capability {
                scope: manager.capabilities().to_string(),
            },
        },
    )
}

/// Serve the plugin API on a Unix socket, replacing any stale socket file
/// left behind by a previous run.
#[cfg(unix)]
pub async fn serve_unix(manager: Manager, socket_path: &Path) -> NasvolResult<()> {
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::remove_file(socket_path) {
        Ok(()) => tracing::debug!(path = %socket_path.display(), "removed stale plugin socket"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let listener = tokio::net::UnixListener::bind(socket_path)?;
    tracing::info!(path = %socket_path.display(), "plugin listening on unix socket");
    axum::serve(listener, router(manager)).await?;
    Ok(())
}

/// Serve the plugin API over TCP.
pub async fn serve_tcp(manager: Manager, addr: SocketAddr) -> NasvolResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "plugin listening on tcp");
    axum::serve(listener, router(manager)).await?;
    Ok(())
}
