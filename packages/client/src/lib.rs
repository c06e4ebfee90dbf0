//! Sync client for the Noteboard canvas server.
//!
//! [`sync::SyncHandle`] owns one connection's lifecycle: connect and
//! reconnect, room membership, heartbeat replies, debounced saves through a
//! [`store::NoteStore`] and application of remote updates.

pub mod cli;
pub mod config;
pub mod error;
pub mod ingress;
pub mod store;
pub mod sync;

pub use cli::run_client;
pub use config::{ClientArgs, IngressConfig, SyncConfig};
pub use error::{ClientError, SyncError};
pub use ingress::BroadcastClient;
pub use store::{BroadcastingNoteStore, InMemoryNoteStore, NoteStore, StoreError};
pub use sync::{ConnectionState, SyncEvent, SyncHandle};
