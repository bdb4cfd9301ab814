//! Wire types for the Docker volume plugin v1 protocol.
//!
//! Field names follow the wire format (PascalCase, `ID` for mount
//! request identifiers). Failed operations are encoded separately as
//! [`ErrorResponse`]; success bodies therefore carry no `Err` field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::volumes::VolumeInfo;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest {
    pub name: String,
    /// Driver options; Docker sends null when none were given.
    #[serde(default)]
    pub opts: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PathRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountRequest {
    pub name: String,
    #[serde(rename = "ID", default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnmountRequest {
    pub name: String,
    #[serde(rename = "ID", default)]
    pub id: String,
}

/// `{}` — the success body for operations with nothing to report.
#[derive(Debug, Default, Serialize)]
pub struct EmptyResponse {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub err: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeBody {
    pub name: String,
    pub mountpoint: String,
}

impl From<VolumeInfo> for VolumeBody {
    fn from(info: VolumeInfo) -> Self {
        Self {
            name: info.name,
            mountpoint: info.path.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    pub volume: VolumeBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    pub volumes: Vec<VolumeBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PathResponse {
    pub mountpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountResponse {
    pub mountpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capability {
    pub scope: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesResponse {
    pub capabilities: Capability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    pub implements: Vec<&'static str>,
}

impl ActivateResponse {
    /// The handshake body: this daemon implements the volume driver API.
    pub fn volume_driver() -> Self {
        Self {
            implements: vec!["VolumeDriver"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_accepts_null_and_missing_opts() {
        let req: CreateRequest = serde_json::from_str(r#"{"Name":"data","Opts":null}"#).unwrap();
        assert_eq!(req.name, "data");
        assert!(req.opts.is_none());

        let req: CreateRequest = serde_json::from_str(r#"{"Name":"data"}"#).unwrap();
        assert!(req.opts.is_none());

        let req: CreateRequest =
            serde_json::from_str(r#"{"Name":"data","Opts":{"uid":"1000"}}"#).unwrap();
        assert_eq!(req.opts.unwrap().get("uid").unwrap(), "1000");
    }

    #[test]
    fn test_mount_request_uses_upper_case_id() {
        let req: MountRequest =
            serde_json::from_str(r#"{"Name":"data","ID":"req-1"}"#).unwrap();
        assert_eq!(req.id, "req-1");
    }

    #[test]
    fn test_responses_serialize_with_wire_names() {
        let body = serde_json::to_value(GetResponse {
            volume: VolumeBody {
                name: "data".into(),
                mountpoint: "/mnt/data".into(),
            },
        })
        .unwrap();
        assert_eq!(body["Volume"]["Name"], "data");
        assert_eq!(body["Volume"]["Mountpoint"], "/mnt/data");

        let body = serde_json::to_value(ActivateResponse::volume_driver()).unwrap();
        assert_eq!(body["Implements"][0], "VolumeDriver");

        let body = serde_json::to_value(ErrorResponse {
            err: "boom".into(),
        })
        .unwrap();
        assert_eq!(body["Err"], "boom");
    }
}
