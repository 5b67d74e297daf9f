//! HTTP router for secret tasks

use axum::{routing::any, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use secretgate_secretsmanager::{handle_request, SecretsProxyState};

/// Create the application router
///
/// CGI servers may mount the script under any path, so every path and
/// method reaches the secret task handler.
pub fn create_router(state: SecretsProxyState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", any(handle_request))
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}
