use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    db::SessionStore,
    middleware::session::{make_span_with_session_id, session_middleware},
    services::Stylist,
};

pub mod outfits;
pub mod preferences;
pub mod store;
pub mod swipes;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub stylist: Stylist,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_session_id))
        .layer(middleware::from_fn(session_middleware))
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deck", get(swipes::deck))
        .route("/swipes", post(swipes::swipe))
        .route(
            "/preferences",
            get(preferences::get_preferences).delete(preferences::reset_preferences),
        )
        .route("/store", get(store::my_store))
        .route("/outfits", post(outfits::generate))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
