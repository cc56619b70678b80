use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::session::SessionId,
    routes::AppState,
    services::OutfitRecommendation,
};

/// Handler for outfit generation
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> AppResult<Json<OutfitRecommendation>> {
    tracing::info!(session_id = %session, "Processing outfit request");

    let outfit = state
        .stylist
        .generate_outfit(state.store.as_ref(), &session.as_str())
        .await?;

    if let Some(error) = &outfit.selection.error {
        tracing::info!(session_id = %session, error = %error, "Outfit served from fallback");
    }

    Ok(Json(outfit))
}
