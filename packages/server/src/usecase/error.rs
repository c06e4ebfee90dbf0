//! UseCase layer errors.

use thiserror::Error;

use crate::domain::{RegistryError, ValueObjectError};

/// Errors while accepting a new connection
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to generate client id: {0}")]
    InvalidClientId(#[from] ValueObjectError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors while joining a canvas room
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("invalid canvas id: {0}")]
    InvalidCanvasId(#[from] ValueObjectError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors while relaying a client's note list
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("client '{0}' has not joined a canvas")]
    NotInCanvas(String),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Validation errors of the broadcast ingress. Reported to the HTTP caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngressError {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Invalid broadcast data")]
    InvalidData,
}
