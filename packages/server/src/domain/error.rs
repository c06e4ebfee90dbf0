//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// ClientId validation error
    #[error("ClientId cannot be empty")]
    ClientIdEmpty,

    /// ClientId too long error
    #[error("ClientId cannot exceed {max} characters (got {actual})")]
    ClientIdTooLong { max: usize, actual: usize },

    /// CanvasId validation error
    #[error("CanvasId cannot be empty")]
    CanvasIdEmpty,

    /// CanvasId too long error
    #[error("CanvasId cannot exceed {max} characters (got {actual})")]
    CanvasIdTooLong { max: usize, actual: usize },
}

/// Errors raised by the session registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The session is not (or no longer) registered
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A session with the same id is already registered
    #[error("Session already registered: {0}")]
    DuplicateSession(String),
}

/// Violations of the per-canvas note list invariants
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NoteListError {
    #[error("Duplicate note id {0}")]
    DuplicateId(i64),

    #[error("Duplicate zIndex {0}")]
    DuplicateZIndex(i64),

    #[error("Note {0} not found")]
    NoteNotFound(i64),
}
