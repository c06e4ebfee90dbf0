//! Client errors.

use thiserror::Error;

use crate::store::StoreError;

/// Errors of the sync controller's transport
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("sync controller has stopped")]
    Stopped,
}

/// Errors of the interactive client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
