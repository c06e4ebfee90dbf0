//! InMemory Session Registry 実装
//!
//! ドメイン層が定義する SessionRegistry trait の具体的な実装。
//! セッションのアリーナ（`HashMap<ClientId, SessionEntry>`）と、キャンバス ID から
//! メンバー集合への索引（`HashMap<CanvasId, Room>`）を 1 つの Mutex で保護します。
//! 全ての変更はこの Mutex を経由するため、同じルームへの同時 join/leave が
//! 重複したルームを作ったり、メンバーを失ったりすることはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{
    Mutex,
    mpsc::{Sender, error::TrySendError},
};

use crate::domain::{
    BroadcastReport, CanvasId, ClientId, RegistryError, RegistrySnapshot, Room, Session,
    SessionRegistry, SweepReport, Timestamp,
};

/// One registered connection: its domain state and outbound channel.
struct SessionEntry {
    session: Session,
    sender: Sender<String>,
}

impl SessionEntry {
    /// Queue a payload without waiting. Full and closed channels both fail.
    fn try_send(&self, payload: String) -> Result<(), TrySendError<String>> {
        self.sender.try_send(payload)
    }
}

/// Sessions plus the room index. Only reachable through the registry lock.
#[derive(Default)]
struct Registry {
    sessions: HashMap<ClientId, SessionEntry>,
    rooms: HashMap<CanvasId, Room>,
}

impl Registry {
    /// Remove a session from its room and drop the room if it became empty.
    fn detach(&mut self, client_id: &ClientId) -> Option<CanvasId> {
        let entry = self.sessions.get_mut(client_id)?;
        let canvas_id = entry.session.unbind()?;

        if let Some(room) = self.rooms.get_mut(&canvas_id) {
            room.remove_member(client_id);
            if room.is_empty() {
                self.rooms.remove(&canvas_id);
                tracing::debug!("Room '{}' is empty and was removed", canvas_id);
            }
        }
        Some(canvas_id)
    }

    fn attach(
        &mut self,
        client_id: &ClientId,
        canvas_id: CanvasId,
    ) -> Result<Option<CanvasId>, RegistryError> {
        if !self.sessions.contains_key(client_id) {
            return Err(RegistryError::SessionNotFound(client_id.to_string()));
        }
        let previous = self.detach(client_id);

        self.rooms
            .entry(canvas_id.clone())
            .or_insert_with(|| Room::new(canvas_id.clone()))
            .add_member(client_id.clone());

        if let Some(entry) = self.sessions.get_mut(client_id) {
            entry.session.bind(canvas_id);
        }
        Ok(previous)
    }

    /// Remove a session completely. Dropping the entry closes its channel.
    fn evict(&mut self, client_id: &ClientId) -> Option<CanvasId> {
        let canvas_id = self.detach(client_id);
        self.sessions.remove(client_id);
        canvas_id
    }

    fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            total_clients: self.sessions.len(),
            canvas_clients: self
                .rooms
                .iter()
                .map(|(id, room)| (id.clone(), room.member_count()))
                .collect(),
        }
    }
}

/// インメモリ Session Registry 実装
pub struct InMemorySessionRegistry {
    inner: Mutex<Registry>,
}

impl InMemorySessionRegistry {
    /// 新しい空の InMemorySessionRegistry を作成
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Registry::default()),
        }
    }
}

impl Default for InMemorySessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn register(
        &self,
        client_id: ClientId,
        sender: Sender<String>,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let mut registry = self.inner.lock().await;
        if registry.sessions.contains_key(&client_id) {
            return Err(RegistryError::DuplicateSession(client_id.into_string()));
        }
        let session = Session::new(client_id.clone(), now);
        registry
            .sessions
            .insert(client_id, SessionEntry { session, sender });
        Ok(())
    }

    async fn unregister(&self, client_id: &ClientId) -> Option<CanvasId> {
        let mut registry = self.inner.lock().await;
        registry.evict(client_id)
    }

    async fn join(
        &self,
        client_id: &ClientId,
        canvas_id: CanvasId,
    ) -> Result<Option<CanvasId>, RegistryError> {
        let mut registry = self.inner.lock().await;
        registry.attach(client_id, canvas_id)
    }

    async fn leave(&self, client_id: &ClientId) -> Result<Option<CanvasId>, RegistryError> {
        let mut registry = self.inner.lock().await;
        if !registry.sessions.contains_key(client_id) {
            return Err(RegistryError::SessionNotFound(client_id.to_string()));
        }
        Ok(registry.detach(client_id))
    }

    async fn touch(&self, client_id: &ClientId, now: Timestamp) -> Result<(), RegistryError> {
        let mut registry = self.inner.lock().await;
        let entry = registry
            .sessions
            .get_mut(client_id)
            .ok_or_else(|| RegistryError::SessionNotFound(client_id.to_string()))?;
        entry.session.touch(now);
        Ok(())
    }

    async fn canvas_of(&self, client_id: &ClientId) -> Option<CanvasId> {
        let registry = self.inner.lock().await;
        registry
            .sessions
            .get(client_id)
            .and_then(|entry| entry.session.canvas_id.clone())
    }

    async fn send_to(&self, client_id: &ClientId, payload: String) -> bool {
        let mut registry = self.inner.lock().await;
        let Some(entry) = registry.sessions.get(client_id) else {
            return false;
        };
        match entry.try_send(payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send to client '{}', evicting: {}", client_id, e);
                registry.evict(client_id);
                false
            }
        }
    }

    async fn broadcast(
        &self,
        canvas_id: &CanvasId,
        payload: String,
        exclude: Option<&ClientId>,
    ) -> BroadcastReport {
        let mut registry = self.inner.lock().await;
        let Some(room) = registry.rooms.get(canvas_id) else {
            return BroadcastReport::default();
        };

        let targets: Vec<ClientId> = room
            .members
            .iter()
            .filter(|id| Some(*id) != exclude)
            .cloned()
            .collect();

        let mut report = BroadcastReport::default();
        for target in targets {
            let result = match registry.sessions.get(&target) {
                Some(entry) => entry.try_send(payload.clone()),
                None => continue,
            };
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to send to client '{}', evicting: {}", target, e);
                    registry.evict(&target);
                    report.evicted.push(target);
                }
            }
        }
        report
    }

    async fn sweep(&self, now: Timestamp, timeout_ms: i64, ping_payload: String) -> SweepReport {
        let mut registry = self.inner.lock().await;
        let mut report = SweepReport::default();

        let expired: Vec<ClientId> = registry
            .sessions
            .values()
            .filter(|entry| entry.session.is_expired(now, timeout_ms))
            .map(|entry| entry.session.id.clone())
            .collect();
        for client_id in expired {
            tracing::info!("Client '{}' timed out", client_id);
            registry.evict(&client_id);
            report.expired.push(client_id);
        }

        let mut dead = Vec::new();
        for (client_id, entry) in registry.sessions.iter() {
            match entry.try_send(ping_payload.clone()) {
                Ok(()) => report.pinged += 1,
                Err(e) => {
                    tracing::warn!("Failed to ping client '{}', evicting: {}", client_id, e);
                    dead.push(client_id.clone());
                }
            }
        }
        for client_id in dead {
            registry.evict(&client_id);
            report.expired.push(client_id);
        }
        report
    }

    async fn snapshot(&self) -> RegistrySnapshot {
        let registry = self.inner.lock().await;
        registry.snapshot()
    }

    async fn close_all(&self) -> Vec<ClientId> {
        let mut registry = self.inner.lock().await;
        registry.rooms.clear();
        registry.sessions.drain().map(|(id, _)| id).collect()
    }
}
