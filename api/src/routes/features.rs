//! Public feature flags

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::collections::BTreeMap;

use crate::AppState;

/// Feature routes, nested under `/settings`
pub fn router() -> Router<AppState> {
    Router::new().route("/features", get(list_features))
}

/// Every flag marked public, by name
pub async fn list_features(State(state): State<AppState>) -> Json<BTreeMap<String, bool>> {
    Json(state.features.public_flags())
}
