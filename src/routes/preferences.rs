use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::session::SessionId,
    models::PreferenceProfile,
    routes::AppState,
    services::preferences::PreferenceStore,
};

pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> AppResult<Json<PreferenceProfile>> {
    let session = session.as_str();
    let profile = PreferenceStore::new(state.store.as_ref(), &session)
        .get_profile()
        .await?;
    Ok(Json(profile))
}

pub async fn reset_preferences(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> AppResult<Json<PreferenceProfile>> {
    let profile = state
        .stylist
        .reset_preferences(state.store.as_ref(), &session.as_str())
        .await?;
    Ok(Json(profile))
}
