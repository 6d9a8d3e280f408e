use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::models::ApiUsage;
use crate::state::AppState;

pub async fn usage_handler(State(state): State<Arc<AppState>>) -> Json<ApiUsage> {
    Json(state.api_usage())
}
