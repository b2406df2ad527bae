//! Router configuration for the web transport.

use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, stats, AppState};
use super::middleware::create_cors_layer;
use super::ws::chat_ws_handler;
use crate::config::ServerConfig;

/// Create the main router.
///
/// Static files are served as the fallback when enabled and the directory
/// exists.
pub fn create_router(app_state: Arc<AppState>, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/ws", get(chat_ws_handler))
        .route("/health", get(health_check))
        .route("/api/stats", get(stats));

    if config.serve_static {
        if Path::new(&config.static_path).is_dir() {
            router = router.fallback_service(ServeDir::new(&config.static_path));
        } else {
            tracing::warn!(
                path = %config.static_path,
                "Static directory not found, static serving disabled"
            );
        }
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins)),
        )
        .with_state(app_state)
}
