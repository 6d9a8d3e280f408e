use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use std::time::Instant;

use crate::error::GatewayError;
use crate::metrics::{
    CACHE_HITS, CACHE_MISSES, CACHE_SIZE, EXTERNAL_CALLS, REQUEST_LATENCY, REQUEST_TOTAL,
};
use crate::models::{DirectionsRequest, DirectionsResponse};
use crate::state::AppState;

pub async fn directions_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DirectionsRequest>,
) -> Result<Json<DirectionsResponse>, GatewayError> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let result = state.directions.car_directions(&request).await;
    match &result {
        Ok(response) if response.from_cache => {
            CACHE_HITS.with_label_values(&["directions"]).inc();
        }
        Ok(_) => {
            CACHE_MISSES.with_label_values(&["directions"]).inc();
            EXTERNAL_CALLS.with_label_values(&["kakao_mobility"]).inc();
            CACHE_SIZE.set(state.cached_entries() as f64);
        }
        Err(_) => {}
    }

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    result.map(Json)
}
