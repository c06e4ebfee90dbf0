//! Shared application state.

use std::sync::Arc;

use crate::{config::ServerConfig, domain::SessionRegistry};

/// State shared by every handler
pub struct AppState {
    /// Registry（データアクセス層の抽象化）
    pub registry: Arc<dyn SessionRegistry>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(registry: Arc<dyn SessionRegistry>, config: ServerConfig) -> Self {
        Self { registry, config }
    }
}
