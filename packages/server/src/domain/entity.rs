//! Core domain models for the note canvas.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::value_object::{CanvasId, ClientId, Timestamp};

/// Grid position of a note's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Extent of a note in grid units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A note card on a canvas.
///
/// Notes belong to the canvas's persisted note list. The hub only relays
/// copies of them and never stores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique within a canvas, assigned monotonically
    pub id: i64,
    /// Markdown text of the card
    pub content: String,
    pub position: Position,
    pub size: Size,
    /// Stacking order, unique within a canvas
    pub z_index: i64,
}

impl Note {
    pub fn new(
        id: i64,
        content: impl Into<String>,
        position: Position,
        size: Size,
        z_index: i64,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            position,
            size,
            z_index,
        }
    }
}

/// Server-side state of one live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Identity assigned at connect time
    pub id: ClientId,
    /// Canvas the session has joined, if any
    pub canvas_id: Option<CanvasId>,
    /// When the connection was accepted
    pub connected_at: Timestamp,
    /// Last time the client proved it is alive
    pub last_heartbeat: Timestamp,
}

impl Session {
    /// Create an unbound session. The connect time counts as the first heartbeat.
    pub fn new(id: ClientId, connected_at: Timestamp) -> Self {
        Self {
            id,
            canvas_id: None,
            connected_at,
            last_heartbeat: connected_at,
        }
    }

    /// Bind the session to a canvas, returning the canvas it was bound to before.
    pub fn bind(&mut self, canvas_id: CanvasId) -> Option<CanvasId> {
        self.canvas_id.replace(canvas_id)
    }

    /// Unbind the session, returning the canvas it was bound to.
    pub fn unbind(&mut self) -> Option<CanvasId> {
        self.canvas_id.take()
    }

    /// Record a heartbeat.
    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_heartbeat {
            self.last_heartbeat = now;
        }
    }

    /// Whether no heartbeat has been seen within `timeout_ms`.
    pub fn is_expired(&self, now: Timestamp, timeout_ms: i64) -> bool {
        now.millis_since(self.last_heartbeat) > timeout_ms
    }
}

/// The set of sessions currently viewing the same canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Canvas identifier
    pub id: CanvasId,
    /// Session ids of the members
    pub members: HashSet<ClientId>,
}

impl Room {
    /// Create a new empty room
    pub fn new(id: CanvasId) -> Self {
        Self {
            id,
            members: HashSet::new(),
        }
    }

    /// Add a member. Returns false if it was already present.
    pub fn add_member(&mut self, client_id: ClientId) -> bool {
        self.members.insert(client_id)
    }

    /// Remove a member. Removing a non-member is a no-op.
    pub fn remove_member(&mut self, client_id: &ClientId) -> bool {
        self.members.remove(client_id)
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.members.contains(client_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
