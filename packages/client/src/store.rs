//! Persistence collaborator of the sync controller.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use noteboard_server::domain::{Note, validate_note_list};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::ingress::BroadcastClient;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("canvas '{0}' not found")]
    CanvasNotFound(String),
    #[error("invalid note list: {0}")]
    InvalidNotes(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Loads and saves a canvas's full note list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn load_notes(&self, canvas_id: &str) -> Result<Vec<Note>, StoreError>;

    /// Persist the list and return the stored copy.
    ///
    /// `exclude_client_id` is the saving session, which already shows the list.
    async fn save_notes(
        &self,
        canvas_id: &str,
        notes: Vec<Note>,
        exclude_client_id: Option<String>,
    ) -> Result<Vec<Note>, StoreError>;
}

/// Map-backed store for demos and tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryNoteStore {
    canvases: Arc<Mutex<HashMap<String, Vec<Note>>>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a canvas with an initial note list. Replaces an existing one.
    pub async fn create_canvas(&self, canvas_id: &str, notes: Vec<Note>) {
        self.canvases
            .lock()
            .await
            .insert(canvas_id.to_string(), notes);
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn load_notes(&self, canvas_id: &str) -> Result<Vec<Note>, StoreError> {
        self.canvases
            .lock()
            .await
            .get(canvas_id)
            .cloned()
            .ok_or_else(|| StoreError::CanvasNotFound(canvas_id.to_string()))
    }

    async fn save_notes(
        &self,
        canvas_id: &str,
        notes: Vec<Note>,
        _exclude_client_id: Option<String>,
    ) -> Result<Vec<Note>, StoreError> {
        validate_note_list(&notes).map_err(|e| StoreError::InvalidNotes(e.to_string()))?;

        let mut canvases = self.canvases.lock().await;
        let stored = canvases
            .get_mut(canvas_id)
            .ok_or_else(|| StoreError::CanvasNotFound(canvas_id.to_string()))?;
        *stored = notes;
        Ok(stored.clone())
    }
}

/// Store decorator that pushes every successful save to the broadcast ingress.
///
/// The broadcast runs detached; the save returns without waiting for it.
pub struct BroadcastingNoteStore<S> {
    inner: S,
    broadcaster: BroadcastClient,
}

impl<S: NoteStore> BroadcastingNoteStore<S> {
    pub fn new(inner: S, broadcaster: BroadcastClient) -> Self {
        Self { inner, broadcaster }
    }
}

#[async_trait]
impl<S: NoteStore> NoteStore for BroadcastingNoteStore<S> {
    async fn load_notes(&self, canvas_id: &str) -> Result<Vec<Note>, StoreError> {
        self.inner.load_notes(canvas_id).await
    }

    async fn save_notes(
        &self,
        canvas_id: &str,
        notes: Vec<Note>,
        exclude_client_id: Option<String>,
    ) -> Result<Vec<Note>, StoreError> {
        let stored = self
            .inner
            .save_notes(canvas_id, notes, exclude_client_id.clone())
            .await?;

        let broadcaster = self.broadcaster.clone();
        let canvas_id = canvas_id.to_string();
        let payload = stored.clone();
        tokio::spawn(async move {
            broadcaster
                .broadcast(&canvas_id, payload, exclude_client_id)
                .await;
        });

        Ok(stored)
    }
}
