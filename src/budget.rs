use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::clock::{self, Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BudgetError {
    #[error("per-minute call limit of {limit} reached")]
    PerMinute { limit: u32 },
    #[error("daily call limit of {limit} reached")]
    Daily { limit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetConfig {
    pub per_minute: u32,
    pub daily: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { per_minute: 60, daily: 400 }
    }
}

#[derive(Debug)]
struct BudgetState {
    minute_count: u32,
    minute_reset_at: DateTime<Utc>,
    day: NaiveDate,
    day_count: u32,
}

const MINUTE: Duration = Duration::from_secs(60);

// per-minute window plus a per-UTC-day cap, rejected calls still count
#[derive(Debug)]
pub struct CallBudget {
    config: BudgetConfig,
    state: Mutex<BudgetState>,
    clock: Arc<dyn Clock>,
}

impl CallBudget {
    pub fn with_clock(config: BudgetConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            config,
            state: Mutex::new(BudgetState {
                minute_count: 0,
                minute_reset_at: clock::after(now, MINUTE),
                day: now.date_naive(),
                day_count: 0,
            }),
            clock,
        }
    }

    pub fn try_acquire(&self) -> Result<(), BudgetError> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now >= state.minute_reset_at {
            state.minute_count = 0;
            state.minute_reset_at = clock::after(now, MINUTE);
        }
        state.minute_count = state.minute_count.saturating_add(1);
        if state.minute_count > self.config.per_minute {
            warn!(limit = self.config.per_minute, "per-minute provider budget exhausted");
            return Err(BudgetError::PerMinute { limit: self.config.per_minute });
        }

        let today = now.date_naive();
        if today != state.day {
            state.day = today;
            state.day_count = 0;
        }
        state.day_count = state.day_count.saturating_add(1);
        if state.day_count > self.config.daily {
            warn!(limit = self.config.daily, "daily provider budget exhausted");
            return Err(BudgetError::Daily { limit: self.config.daily });
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct UsageCounter {
    total: AtomicU64,
    today: Mutex<(NaiveDate, u64)>,
    clock: Arc<dyn Clock>,
}

impl Default for UsageCounter {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl UsageCounter {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let day = clock.now().date_naive();
        Self { total: AtomicU64::new(0), today: Mutex::new((day, 0)), clock }
    }

    pub fn record(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let today = self.clock.now().date_naive();
        let mut guard = self.today.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.0 != today {
            *guard = (today, 0);
        }
        guard.1 += 1;
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn today(&self) -> u64 {
        let today = self.clock.now().date_naive();
        let guard = self.today.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.0 == today { guard.1 } else { 0 }
    }
}
