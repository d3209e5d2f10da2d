//! Per-client-IP fixed-window rate limiting.
//!
//! Each IP owns a counter and a window deadline. The first request (or the first one after
//! the deadline) opens a new window with a count of one; later requests inside the window
//! are admitted while the count before increment is below the limit.
//!
//! Counters are process-local. The check and the increment happen under one lock, so two
//! concurrent requests from the same IP cannot both slip past the limit.

use crate::clock::Clock;
use crate::config::RateLimitSettings;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RateLimitEntry {
    count: u32,
    window_reset_at_ms: i64,
}

/// Outcome of one rate-limit check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
    /// Whole seconds until the window resets, rounded up.
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    settings: RateLimitSettings,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> RateLimitSettings {
        self.settings
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.settings.window.as_millis()).unwrap_or(i64::MAX)
    }

    /// Record a request from `ip` and decide whether it may proceed.
    pub fn check(&self, ip: &str) -> RateDecision {
        let now = self.clock.now_ms();
        let limit = self.settings.max_requests;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = match entries.get_mut(ip) {
            Some(entry) if now < entry.window_reset_at_ms => {
                if entry.count < limit {
                    entry.count += 1;
                    *entry
                } else {
                    let entry = *entry;
                    return decision(false, limit, entry, now);
                }
            }
            _ => {
                let entry = RateLimitEntry {
                    count: 1,
                    window_reset_at_ms: now.saturating_add(self.window_ms()),
                };
                entries.insert(ip.to_string(), entry);
                entry
            }
        };

        decision(true, limit, entry, now)
    }

    /// Convenience wrapper returning only the admit/reject bit.
    pub fn check_rate_limit(&self, ip: &str) -> bool {
        self.check(ip).allowed
    }

    /// Drop entries whose window has already elapsed. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| now < entry.window_reset_at_ms);
        before - entries.len()
    }

    /// Number of IPs currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run [`RateLimiter::sweep_expired`] once per window on the current tokio runtime.
    pub fn spawn_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let period = self.settings.window;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = self.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired rate-limit entries");
                }
            }
        })
    }
}

fn decision(allowed: bool, limit: u32, entry: RateLimitEntry, now: i64) -> RateDecision {
    let wait_ms = entry.window_reset_at_ms.saturating_sub(now).max(0);
    RateDecision {
        allowed,
        remaining: limit.saturating_sub(entry.count),
        reset_at_ms: entry.window_reset_at_ms,
        retry_after_secs: u64::try_from((wait_ms + 999) / 1000).unwrap_or(0),
    }
}
