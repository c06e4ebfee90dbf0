//! Domain layer for the note canvas.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod notes;
pub mod placement;
pub mod repository;
pub mod value_object;

pub use entity::{Note, Position, Room, Session, Size};
pub use error::{NoteListError, RegistryError, ValueObjectError};
pub use factory::ClientIdFactory;
pub use notes::{bring_to_front, next_note_id, next_z_index, validate_note_list};
pub use placement::{PlacementConfig, RingCandidates, place, place_with};
pub use repository::{BroadcastReport, RegistrySnapshot, SessionRegistry, SweepReport};
pub use value_object::{CanvasId, ClientId, Timestamp};
