//! HTTP API request and response DTOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Note, RegistrySnapshot};

/// The only `type` accepted by the broadcast ingress
pub const NOTES_UPDATE_TYPE: &str = "notes_update";

/// Body of `POST /broadcast`.
///
/// Every field is optional on the wire so that validation can answer with a
/// client error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequestDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_client_id: Option<String>,
}

impl BroadcastRequestDto {
    pub fn notes_update(canvas_id: &str, notes: Vec<Note>, exclude_client_id: Option<String>) -> Self {
        Self {
            r#type: Some(NOTES_UPDATE_TYPE.to_string()),
            canvas_id: Some(canvas_id.to_string()),
            notes: Some(notes),
            exclude_client_id,
        }
    }
}

/// Accepted broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastResponseDto {
    pub success: bool,
}

/// Error body for client and routing errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub error: String,
}

/// Body of `GET /stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    pub total_clients: usize,
    pub active_canvases: usize,
    pub canvas_clients: BTreeMap<String, usize>,
}

impl From<RegistrySnapshot> for StatsDto {
    fn from(snapshot: RegistrySnapshot) -> Self {
        Self {
            total_clients: snapshot.total_clients,
            active_canvases: snapshot.active_canvases(),
            canvas_clients: snapshot
                .canvas_clients
                .into_iter()
                .map(|(id, count)| (id.into_string(), count))
                .collect(),
        }
    }
}
