use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::clock::{self, Clock, SystemClock};

pub const DEFAULT_MAX_RECENT: usize = 10;

// Cache entry with its absolute expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub payload: V,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
pub struct ExpiringCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    recent: DashMap<u64, VecDeque<String>>,
    max_recent: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECENT)
    }
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new(max_recent: usize) -> Self {
        Self {
            entries: DashMap::new(),
            recent: DashMap::new(),
            max_recent,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn put(&self, key: impl Into<String>, payload: V, ttl: Duration) {
        let expires_at = clock::after(self.clock.now(), ttl);
        self.entries.insert(key.into(), CacheEntry { payload, expires_at });
    }

    // expired entries are evicted on read
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.payload.clone()),
            Some(_) => {}
            None => return None,
        }

        // a concurrent put may have refreshed the key since the read
        if self.entries.remove_if(key, |_, entry| entry.is_expired(now)).is_some() {
            debug!(key, "evicted expired cache entry");
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    // keywords are trimmed and lowercased, newest first
    pub fn add_recent(&self, user_id: u64, keyword: &str) {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return;
        }

        let mut list = self.recent.entry(user_id).or_default();
        list.retain(|existing| existing != &keyword);
        list.push_front(keyword);
        list.truncate(self.max_recent);
    }

    pub fn get_recent(&self, user_id: u64) -> Vec<String> {
        self.recent
            .get(&user_id)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_recent(&self, user_id: u64) {
        if self.recent.remove(&user_id).is_some() {
            debug!(user_id, "cleared recent keywords");
        }
    }
}
