use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::session::SessionId,
    models::{OutfitCard, PreferenceProfile, SwipeAction},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub outfit_id: String,
    pub action: SwipeAction,
}

/// Handler for the swipe deck
pub async fn deck(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<OutfitCard>>> {
    let outfits = state.stylist.swipe_deck().await?;
    Ok(Json(outfits.as_ref().clone()))
}

/// Handler recording a like or dislike
pub async fn swipe(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Json(request): Json<SwipeRequest>,
) -> AppResult<Json<PreferenceProfile>> {
    let profile = state
        .stylist
        .record_swipe(
            state.store.as_ref(),
            &session.as_str(),
            &request.outfit_id,
            request.action,
        )
        .await?;
    Ok(Json(profile))
}
