//! Router construction and server lifecycle.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::ServerConfig,
    domain::SessionRegistry,
    error::ServerError,
    infrastructure::repository::InMemorySessionRegistry,
    ui::{handler, liveness::spawn_liveness_monitor, signal::shutdown_signal, state::AppState},
};

/// Build the application router.
///
/// The WebSocket endpoint is served at both `/` and `/ws`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handler::websocket_handler))
        .route("/ws", get(handler::websocket_handler))
        .route("/broadcast", post(handler::broadcast))
        .route("/stats", get(handler::stats))
        .route("/api/health", get(handler::health_check))
        .fallback(handler::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry: Arc<dyn SessionRegistry> = Arc::new(InMemorySessionRegistry::new());
    let liveness = spawn_liveness_monitor(
        registry.clone(),
        config.ping_interval,
        config.heartbeat_timeout,
    );
    let state = Arc::new(AppState::new(registry.clone(), config));
    let app = build_router(state);
    let stop_liveness = liveness.abort_handle();

    // Graceful shutdown waits for upgraded connections, so the sockets are
    // closed when the signal fires rather than after serve returns.
    let shutdown = async move {
        shutdown.await;
        stop_liveness.abort();
        let closed = registry.close_all().await;
        tracing::info!("Shutting down, closed {} connections", closed.len());
    };

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    liveness.abort();
    tracing::info!("Server stopped");
    result.map_err(ServerError::from)
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    serve(listener, config, shutdown_signal()).await
}
