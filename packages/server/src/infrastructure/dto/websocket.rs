//! WebSocket message DTOs for the real-time protocol.
//!
//! Every frame is a JSON object tagged by `type`:
//! `join_canvas`, `leave_canvas`, `notes_update`, `ping` or `pong`.

use serde::{Deserialize, Serialize};

use crate::domain::Note;

/// A real-time protocol frame, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WsMessage {
    /// Client asks to enter a canvas room
    JoinCanvas {
        canvas_id: String,
        #[serde(default)]
        timestamp: i64,
    },
    /// Client leaves its current room
    LeaveCanvas {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canvas_id: Option<String>,
        #[serde(default)]
        timestamp: i64,
    },
    /// Full note list of a canvas
    NotesUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canvas_id: Option<String>,
        notes: Vec<Note>,
        #[serde(default)]
        timestamp: i64,
    },
    /// Liveness probe. The first ping after connect carries the client's id.
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        #[serde(default)]
        timestamp: i64,
    },
    /// Liveness answer
    Pong {
        #[serde(default)]
        timestamp: i64,
    },
    /// Any `type` this side does not understand
    #[serde(other)]
    Unknown,
}

impl WsMessage {
    pub fn join_canvas(canvas_id: impl Into<String>, timestamp: i64) -> Self {
        Self::JoinCanvas {
            canvas_id: canvas_id.into(),
            timestamp,
        }
    }

    pub fn leave_canvas(canvas_id: impl Into<String>, timestamp: i64) -> Self {
        Self::LeaveCanvas {
            canvas_id: Some(canvas_id.into()),
            timestamp,
        }
    }

    pub fn notes_update(canvas_id: impl Into<String>, notes: Vec<Note>, timestamp: i64) -> Self {
        Self::NotesUpdate {
            canvas_id: Some(canvas_id.into()),
            notes,
            timestamp,
        }
    }

    pub fn ping(client_id: Option<String>, timestamp: i64) -> Self {
        Self::Ping {
            client_id,
            timestamp,
        }
    }

    pub fn pong(timestamp: i64) -> Self {
        Self::Pong { timestamp }
    }

    /// Wire name of the frame type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinCanvas { .. } => "join_canvas",
            Self::LeaveCanvas { .. } => "leave_canvas",
            Self::NotesUpdate { .. } => "notes_update",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Unknown => "unknown",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
