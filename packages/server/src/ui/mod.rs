//! WebSocket and HTTP surface of the server.

mod handler;
mod liveness;
mod runner;
mod signal;
pub mod state;

pub use runner::{build_router, run, serve};
