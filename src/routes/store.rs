use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::session::SessionId,
    models::{Product, Scored},
    routes::AppState,
};

/// Handler for the personalised product listing
pub async fn my_store(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> AppResult<Json<Vec<Scored<Product>>>> {
    let listing = state
        .stylist
        .my_store(state.store.as_ref(), &session.as_str())
        .await?;
    Ok(Json(listing))
}
