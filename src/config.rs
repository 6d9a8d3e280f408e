use clap::Parser;
use std::time::Duration;

use crate::budget::BudgetConfig;
use crate::directions::DirectionsConfig;
use crate::places::PlaceCacheConfig;
use crate::rate_limit::{PolicyConfig, ThrottleConfig};

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "culturemap-gateway")]
#[command(about = "Rate limiting and caching gateway for the culture outing planner")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Planner backend the gateway forwards to
    // Example: "localhost:8081"
    #[arg(short, long, default_value = "localhost:8081")]
    pub upstream: String,

    // Kakao REST API key; directions and nearby search are disabled without it
    #[arg(long, env = "KAKAO_REST_API_KEY")]
    pub kakao_rest_api_key: Option<String>,

    #[arg(long, default_value = "https://apis-navi.kakaomobility.com/v1/directions")]
    pub kakao_mobility_url: String,

    #[arg(long, default_value = "https://dapi.kakao.com/v2/local/search")]
    pub kakao_local_url: String,

    // Login attempts allowed per window, per "ip:email"
    #[arg(long, default_value_t = 5)]
    pub login_limit: u32,

    // Login attempt window in seconds
    #[arg(long, default_value_t = 300)]
    pub login_window: u64,

    // Nearby searches allowed per window, per client IP
    #[arg(long, default_value_t = 30)]
    pub search_limit: u32,

    // Search window in seconds
    #[arg(long, default_value_t = 60)]
    pub search_window: u64,

    // Search result cache TTL in seconds
    #[arg(long, default_value_t = 600)]
    pub search_cache_ttl: u64,

    // Popular places cache TTL in seconds
    #[arg(long, default_value_t = 3600)]
    pub popular_cache_ttl: u64,

    // Recent searches kept per user
    #[arg(long, default_value_t = 10)]
    pub max_recent: usize,

    // Directions cache TTL in seconds
    #[arg(long, default_value_t = 600)]
    pub directions_cache_ttl: u64,

    // Directions provider calls per minute
    #[arg(long, default_value_t = 60)]
    pub directions_per_minute: u32,

    // Directions provider calls per day
    #[arg(long, default_value_t = 400)]
    pub directions_daily: u32,

    // Seconds between sweeps of expired counters and cache entries
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            login_attempt: PolicyConfig {
                limit: self.login_limit,
                window: Duration::from_secs(self.login_window),
            },
            search: PolicyConfig {
                limit: self.search_limit,
                window: Duration::from_secs(self.search_window),
            },
        }
    }

    pub fn place_cache(&self) -> PlaceCacheConfig {
        PlaceCacheConfig {
            search_ttl: Duration::from_secs(self.search_cache_ttl),
            popular_ttl: Duration::from_secs(self.popular_cache_ttl),
            max_recent: self.max_recent,
        }
    }

    pub fn directions(&self) -> DirectionsConfig {
        DirectionsConfig {
            cache_ttl: Duration::from_secs(self.directions_cache_ttl),
            budget: BudgetConfig {
                per_minute: self.directions_per_minute,
                daily: self.directions_daily,
            },
        }
    }

    // blank keys count as missing
    pub fn kakao_key(&self) -> Option<&str> {
        self.kakao_rest_api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}
