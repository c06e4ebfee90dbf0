//! Client-side connection lifecycle and note synchronization.

pub mod backoff;
pub mod controller;
pub mod machine;

pub use backoff::Backoff;
pub use controller::SyncHandle;
pub use machine::{ConnectionState, Effect, Input, SyncEvent, SyncMachine};
