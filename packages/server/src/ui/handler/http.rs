//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    infrastructure::dto::http::{BroadcastResponseDto, ErrorResponseDto, StatsDto},
    ui::state::AppState,
    usecase::IngressBroadcastUseCase,
};

/// Push a note list into a canvas room.
///
/// The body is taken as raw text so that invalid JSON gets the same error
/// shape as invalid data.
pub async fn broadcast(State(state): State<Arc<AppState>>, body: String) -> Response {
    let usecase = IngressBroadcastUseCase::new(state.registry.clone());
    match usecase.execute(&body) {
        Ok(()) => Json(BroadcastResponseDto { success: true }).into_response(),
        Err(e) => {
            tracing::warn!("Rejected broadcast request: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponseDto {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Connection and room counts
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsDto> {
    Json(StatsDto::from(state.registry.snapshot().await))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn not_found() -> (StatusCode, Json<ErrorResponseDto>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponseDto {
            error: "Not found".to_string(),
        }),
    )
}
