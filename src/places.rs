use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::ExpiringCache;
use crate::clock::Clock;

pub type PlaceList = Vec<Value>;

const POPULAR_KEY: &str = "popular";

#[derive(Debug, Clone, Copy)]
pub struct PlaceCacheConfig {
    pub search_ttl: Duration,
    pub popular_ttl: Duration,
    pub max_recent: usize,
}

impl Default for PlaceCacheConfig {
    fn default() -> Self {
        Self {
            search_ttl: Duration::from_secs(10 * 60),
            popular_ttl: Duration::from_secs(60 * 60),
            max_recent: crate::cache::DEFAULT_MAX_RECENT,
        }
    }
}

pub fn search_key(user_id: u64, keyword: &str) -> String {
    format!("{}:{}", user_id, keyword.to_lowercase())
}

#[derive(Debug)]
pub struct PlaceCache {
    cache: ExpiringCache<PlaceList>,
    config: PlaceCacheConfig,
}

impl PlaceCache {
    pub fn new(config: PlaceCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self { cache: ExpiringCache::new(config.max_recent).with_clock(clock), config }
    }

    pub fn cached_search(&self, user_id: u64, keyword: &str) -> Option<PlaceList> {
        let key = search_key(user_id, keyword);
        let hit = self.cache.get(&key);
        if hit.is_some() {
            debug!(key = %key, "search cache hit");
        }
        hit
    }

    pub fn store_search(&self, user_id: u64, keyword: &str, places: PlaceList) {
        let key = search_key(user_id, keyword);
        debug!(key = %key, count = places.len(), "caching search results");
        self.cache.put(key, places, self.config.search_ttl);
    }

    pub fn cached_popular(&self) -> Option<PlaceList> {
        self.cache.get(POPULAR_KEY)
    }

    pub fn store_popular(&self, places: PlaceList) {
        debug!(count = places.len(), "caching popular places");
        self.cache.put(POPULAR_KEY, places, self.config.popular_ttl);
    }

    pub fn add_recent(&self, user_id: u64, keyword: &str) {
        self.cache.add_recent(user_id, keyword);
    }

    pub fn recent(&self, user_id: u64) -> Vec<String> {
        self.cache.get_recent(user_id)
    }

    pub fn clear_recent(&self, user_id: u64) {
        self.cache.clear_recent(user_id);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn sweep_expired(&self) -> usize {
        self.cache.sweep_expired()
    }
}
