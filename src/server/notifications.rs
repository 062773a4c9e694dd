// src/server/notifications.rs
use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::activity::collect_activity;
use crate::data_types::Activity;
use crate::server::{ApiResponse, AppState};

/// Newest activity across every configured tab.
pub async fn get_notifications(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<Activity>>> {
    let tables = state.fetch_sources().await;
    let batches = state.batches(&tables);
    ApiResponse::ok(collect_activity(&batches, &state.dates, state.activity_limit))
}
