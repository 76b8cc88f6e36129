//! Billing provider callback
//!
//! The provider retries anything that is not a 2xx, so every event is
//! acknowledged; problems are logged by the reconciler instead.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::AppState;

/// Largest callback body accepted. Provider events embed whole invoice and
/// subscription objects and can pass axum's 2 MiB default.
pub const CALLBACK_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Callback route, mounted at the configured billing prefix
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/billing/callback", post(callback))
        .layer(DefaultBodyLimit::max(CALLBACK_BODY_LIMIT))
}

/// Receive a billing event
pub async fn callback(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let outcome = state.reconciler.handle_payload(&body).await;
    tracing::debug!(outcome = ?outcome, bytes = body.len(), "billing callback handled");
    Json(json!({ "received": true }))
}
