use lazy_static::lazy_static;
use prometheus::{
    Gauge, Histogram, IntCounter, IntCounterVec, register_gauge, register_histogram,
    register_int_counter, register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounter =
        register_int_counter!("culturemap_requests_total", "Total number of requests").unwrap();
    pub static ref CACHE_HITS: IntCounterVec = register_int_counter_vec!(
        "culturemap_cache_hits_total",
        "Total cache hits",
        &["region"]
    )
    .unwrap();
    pub static ref CACHE_MISSES: IntCounterVec = register_int_counter_vec!(
        "culturemap_cache_misses_total",
        "Total cache misses",
        &["region"]
    )
    .unwrap();
    pub static ref THROTTLED: IntCounterVec = register_int_counter_vec!(
        "culturemap_throttled_total",
        "Requests rejected by a rate limit policy",
        &["policy"]
    )
    .unwrap();
    pub static ref EXTERNAL_CALLS: IntCounterVec = register_int_counter_vec!(
        "culturemap_external_calls_total",
        "Calls forwarded to the backend or to Kakao",
        &["api"]
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "culturemap_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("culturemap_cache_size", "Current number of items in the caches").unwrap();
}
