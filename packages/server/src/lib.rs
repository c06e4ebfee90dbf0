//! Real-time fan-out server for a shared note canvas.
//!
//! Clients connect over WebSocket, join a canvas room and exchange full note
//! lists with the other members of that room. An HTTP ingress lets the
//! persistence layer push saved lists into a room.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub use config::{ServerArgs, ServerConfig};
pub use error::ServerError;
pub use ui::{build_router, run as run_server, serve};
