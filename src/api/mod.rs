use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod handlers;

/// Build the API router. Routes are relative — the caller nests this under
/// the resolved base path (`/api`, `/.netlify/functions`, or the override).
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(handlers::generate))
        .route("/tracker/test", post(handlers::test_tracker_connection))
        .route("/tracker/submit", post(handlers::submit_ticket))
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
