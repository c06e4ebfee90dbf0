//! HTTP caller for the server's broadcast ingress.

use noteboard_server::{
    domain::Note,
    infrastructure::dto::http::{BroadcastRequestDto, StatsDto},
};

use crate::config::IngressConfig;

/// Pushes saved note lists to the server and reads its stats.
///
/// Failures are logged and swallowed: a missed broadcast only delays peers
/// until their next update.
#[derive(Debug, Clone)]
pub struct BroadcastClient {
    http: reqwest::Client,
    base_url: String,
}

impl BroadcastClient {
    pub fn new(config: &IngressConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url(),
        }
    }

    /// Ask the server to relay `notes` to the canvas room, skipping `exclude_client_id`.
    pub async fn broadcast(&self, canvas_id: &str, notes: Vec<Note>, exclude_client_id: Option<String>) {
        let body = BroadcastRequestDto::notes_update(canvas_id, notes, exclude_client_id);
        let result = self
            .http
            .post(format!("{}/broadcast", self.base_url))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Broadcast for canvas '{}' accepted", canvas_id);
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                tracing::warn!(
                    "Broadcast for canvas '{}' rejected with {}: {}",
                    canvas_id,
                    status,
                    text
                );
            }
            Err(e) => tracing::warn!("Broadcast for canvas '{}' failed: {}", canvas_id, e),
        }
    }

    pub async fn stats(&self) -> Option<StatsDto> {
        let response = match self.http.get(format!("{}/stats", self.base_url)).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch stats: {}", e);
                return None;
            }
        };
        match response.error_for_status() {
            Ok(response) => match response.json::<StatsDto>().await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    tracing::warn!("Failed to parse stats: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Stats request failed: {}", e);
                None
            }
        }
    }
}
