use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use crate::metrics::CACHE_SIZE;
use crate::state::AppState;

// one pass over every expiring store, returns how many entries were dropped
pub fn sweep(state: &AppState) -> usize {
    let counters = state.throttle.sweep_expired();
    let places = state.places.sweep_expired();
    let directions = state.directions.sweep_expired();
    CACHE_SIZE.set(state.cached_entries() as f64);

    debug!(counters, places, directions, "sweep finished");
    counters + places + directions
}

// Sweeper - drops expired counters and cache entries on a timer
pub async fn sweeper(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every);

    info!(interval = ?every, "sweeper started");

    loop {
        interval.tick().await;
        sweep(&state);
    }
}
