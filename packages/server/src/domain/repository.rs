//! Repository trait for the session registry.
//!
//! The domain layer defines the interface; the infrastructure layer provides
//! the implementation. Every method is one serialized mutation or read of
//! the registry.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use super::{
    error::RegistryError,
    value_object::{CanvasId, ClientId, Timestamp},
};

/// Outcome of a fan-out to one room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions the message was queued for
    pub delivered: usize,
    /// Sessions dropped because their outbound channel was closed or full
    pub evicted: Vec<ClientId>,
}

/// Outcome of one liveness sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions that were sent a ping
    pub pinged: usize,
    /// Sessions removed for missing heartbeats (or a dead channel)
    pub expired: Vec<ClientId>,
}

/// Read-only view for introspection. Never exposes member identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub total_clients: usize,
    pub canvas_clients: BTreeMap<CanvasId, usize>,
}

impl RegistrySnapshot {
    pub fn active_canvases(&self) -> usize {
        self.canvas_clients.len()
    }
}

/// Registry of live sessions and the rooms they belong to
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Register a new, unbound session with its outbound channel.
    async fn register(
        &self,
        client_id: ClientId,
        sender: Sender<String>,
        now: Timestamp,
    ) -> Result<(), RegistryError>;

    /// Remove a session entirely, leaving its room first.
    ///
    /// Returns the canvas it was in. Unregistering an unknown session is a no-op.
    async fn unregister(&self, client_id: &ClientId) -> Option<CanvasId>;

    /// Move a session into `canvas_id`, leaving any previous room.
    ///
    /// Returns the previous canvas.
    async fn join(
        &self,
        client_id: &ClientId,
        canvas_id: CanvasId,
    ) -> Result<Option<CanvasId>, RegistryError>;

    /// Take a session out of its room. Returns the canvas it left, if any.
    async fn leave(&self, client_id: &ClientId) -> Result<Option<CanvasId>, RegistryError>;

    /// Record a heartbeat for a session.
    async fn touch(&self, client_id: &ClientId, now: Timestamp) -> Result<(), RegistryError>;

    /// Canvas the session is currently bound to.
    async fn canvas_of(&self, client_id: &ClientId) -> Option<CanvasId>;

    /// Queue `payload` for one session. A failed send evicts the session.
    async fn send_to(&self, client_id: &ClientId, payload: String) -> bool;

    /// Queue `payload` for every member of `canvas_id` except `exclude`.
    async fn broadcast(
        &self,
        canvas_id: &CanvasId,
        payload: String,
        exclude: Option<&ClientId>,
    ) -> BroadcastReport;

    /// Evict sessions silent for longer than `timeout_ms`, ping the rest.
    async fn sweep(&self, now: Timestamp, timeout_ms: i64, ping_payload: String) -> SweepReport;

    /// Room sizes and session count.
    async fn snapshot(&self) -> RegistrySnapshot;

    /// Remove every session and room, closing all outbound channels.
    ///
    /// Returns the ids of the removed sessions.
    async fn close_all(&self) -> Vec<ClientId>;
}
