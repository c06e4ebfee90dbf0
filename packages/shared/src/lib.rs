//! Utilities shared by the Noteboard server and client.

pub mod logger;
pub mod time;
