use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::error::GatewayError;
use crate::extract::{ClientIp, UserId};
use crate::metrics::{
    CACHE_HITS, CACHE_MISSES, CACHE_SIZE, EXTERNAL_CALLS, REQUEST_LATENCY, REQUEST_TOTAL,
    THROTTLED,
};
use crate::models::{NearbyQuery, SearchQuery};
use crate::places::PlaceList;
use crate::rate_limit::Policy;
use crate::state::AppState;

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PlaceList>, GatewayError> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let result = search_places(&state, user_id, query.keyword.as_deref()).await;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    result.map(Json)
}

// only searches fetched from the backend land in the recent list
async fn search_places(
    state: &AppState,
    user_id: Option<u64>,
    keyword: Option<&str>,
) -> Result<PlaceList, GatewayError> {
    let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
    let cacheable = keyword.zip(user_id);

    if let Some((keyword, user_id)) = cacheable {
        if let Some(places) = state.places.cached_search(user_id, keyword) {
            CACHE_HITS.with_label_values(&["search"]).inc();
            return Ok(places);
        }
        CACHE_MISSES.with_label_values(&["search"]).inc();
    }

    EXTERNAL_CALLS.with_label_values(&["places"]).inc();
    let places = state.upstream.search_places(keyword).await?;

    if let Some((keyword, user_id)) = cacheable {
        state.places.store_search(user_id, keyword, places.clone());
        state.places.add_recent(user_id, keyword);
        CACHE_SIZE.set(state.cached_entries() as f64);
    }
    Ok(places)
}

pub async fn popular_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlaceList>, GatewayError> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let result = popular_places(&state).await;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    result.map(Json)
}

async fn popular_places(state: &AppState) -> Result<PlaceList, GatewayError> {
    if let Some(places) = state.places.cached_popular() {
        CACHE_HITS.with_label_values(&["popular"]).inc();
        return Ok(places);
    }
    CACHE_MISSES.with_label_values(&["popular"]).inc();

    EXTERNAL_CALLS.with_label_values(&["places"]).inc();
    let places = state.upstream.popular_places().await?;
    state.places.store_popular(places.clone());
    CACHE_SIZE.set(state.cached_entries() as f64);
    Ok(places)
}

pub async fn recent_handler(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> Json<Vec<String>> {
    Json(user_id.map(|id| state.places.recent(id)).unwrap_or_default())
}

pub async fn clear_recent_handler(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> StatusCode {
    if let Some(id) = user_id {
        state.places.clear_recent(id);
    }
    StatusCode::NO_CONTENT
}

// culture facilities near a point, throttled per client IP
pub async fn nearby_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Value>, GatewayError> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let result = nearby_places(&state, &ip, &query).await;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    result.map(Json)
}

async fn nearby_places(
    state: &AppState,
    ip: &str,
    query: &NearbyQuery,
) -> Result<Value, GatewayError> {
    if state.throttle.check_and_consume(Policy::Search, ip) {
        THROTTLED.with_label_values(&[Policy::Search.as_str()]).inc();
        return Err(GatewayError::RateLimited { policy: Policy::Search });
    }

    let Some(kakao) = &state.kakao else {
        return Err(GatewayError::Disabled("nearby search"));
    };

    EXTERNAL_CALLS.with_label_values(&["kakao_local"]).inc();
    let places = kakao.nearby_culture_places(query).await?;
    state.search_usage.record();
    Ok(places)
}
