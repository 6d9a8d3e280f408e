use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{self, Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    LoginAttempt,
    Search,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::LoginAttempt => "login_attempt",
            Policy::Search => "search",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    pub limit: u32,
    pub window: Duration,
}

impl PolicyConfig {
    pub const LOGIN_ATTEMPT: PolicyConfig =
        PolicyConfig { limit: 5, window: Duration::from_secs(300) };
    pub const SEARCH: PolicyConfig = PolicyConfig { limit: 30, window: Duration::from_secs(60) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub login_attempt: PolicyConfig,
    pub search: PolicyConfig,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { login_attempt: PolicyConfig::LOGIN_ATTEMPT, search: PolicyConfig::SEARCH }
    }
}

// Rate limit entry - tracks calls per identity within the current window
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    fn new(now: DateTime<Utc>, window: Duration) -> Self {
        Self { count: 0, reset_at: clock::after(now, window) }
    }

    // shared by inline resets and sweeps
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }
}

#[derive(Debug)]
struct PolicyState {
    config: PolicyConfig,
    counters: DashMap<String, RateLimitEntry>,
}

impl PolicyState {
    fn new(config: PolicyConfig) -> Self {
        Self { config, counters: DashMap::new() }
    }
}

// fixed windows: a burst across a boundary can get up to twice the limit through
#[derive(Debug)]
pub struct RateThrottle {
    login_attempt: PolicyState,
    search: PolicyState,
    clock: Arc<dyn Clock>,
}

impl Default for RateThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

impl RateThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            login_attempt: PolicyState::new(config.login_attempt),
            search: PolicyState::new(config.search),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn state(&self, policy: Policy) -> &PolicyState {
        match policy {
            Policy::LoginAttempt => &self.login_attempt,
            Policy::Search => &self.search,
        }
    }

    // counts the call even when it gets rejected
    pub fn check_and_consume(&self, policy: Policy, identity: &str) -> bool {
        let state = self.state(policy);
        let now = self.clock.now();
        let window = state.config.window;

        let count = {
            let mut entry = state
                .counters
                .entry(identity.to_string())
                .or_insert_with(|| RateLimitEntry::new(now, window));

            // window elapsed..? start a new one at `now`
            if entry.is_expired(now) {
                entry.count = 0;
                entry.reset_at = clock::after(now, window);
            }
            entry.count = entry.count.saturating_add(1);
            entry.count
        };

        if count > state.config.limit {
            warn!(policy = %policy, identity, count, limit = state.config.limit, "rate limit exceeded");
            return true;
        }
        false
    }

    pub fn reset(&self, policy: Policy, identity: &str) {
        if self.state(policy).counters.remove(identity).is_some() {
            debug!(policy = %policy, identity, "rate limit counter reset");
        }
    }

    pub fn count(&self, policy: Policy, identity: &str) -> u32 {
        let now = self.clock.now();
        self.state(policy)
            .counters
            .get(identity)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    pub fn tracked(&self, policy: Policy) -> usize {
        self.state(policy).counters.len()
    }

    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        for state in [&self.login_attempt, &self.search] {
            let before = state.counters.len();
            state.counters.retain(|_, entry| !entry.is_expired(now));
            removed += before.saturating_sub(state.counters.len());
        }
        if removed > 0 {
            debug!(removed, "swept expired rate limit windows");
        }
        removed
    }
}
