//! # Sliding-Window Rate Limiting
//!
//! Each key (`prefix:client[:user]`) owns an ordered list of the instants at
//! which its accepted requests arrived. On every check:
//!
//! 1. timestamps at least one window old are evicted,
//! 2. if the remaining count has reached the limit the request is rejected,
//!    with `retry_after` = when the oldest timestamp leaves the window,
//! 3. otherwise `now` is appended and the request is accepted.
//!
//! The store is a [`DashMap`]; holding an entry's shard lock for the whole
//! evict/count/append sequence makes it atomic per key, while unrelated
//! keys on other shards never contend.
//!
//! Because rejected requests are not recorded, a key never holds more than
//! `limit` timestamps. A periodic sweep ([`RateLimiter::spawn_sweeper`])
//! removes keys whose lists have emptied; skipping it only costs memory,
//! since eviction also happens lazily on access.
//!
//! The store is process-local: behind a load balancer with N instances a
//! client effectively gets N × limit.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;

// ── Profiles ────────────────────────────────────────────────────────────────

/// A named limit: at most `max_requests` per `window` for each key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitProfile {
    /// Key prefix; separates the counters of different profiles.
    pub prefix: String,
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
    /// Key by authenticated subject as well as client address, when the
    /// identity is already in the context.
    pub per_user: bool,
}

impl RateLimitProfile {
    /// General API traffic: 100 requests per minute.
    pub fn api() -> Self {
        Self::new("api", 100, Duration::from_secs(60))
    }

    /// Credential endpoints: 10 attempts per 15 minutes.
    pub fn auth() -> Self {
        Self::new("auth", 10, Duration::from_secs(15 * 60))
    }

    /// Sensitive operations (approvals, payouts): 20 per minute.
    pub fn sensitive() -> Self {
        Self::new("sensitive", 20, Duration::from_secs(60))
    }

    /// Custom profile.
    pub fn new(prefix: impl Into<String>, max_requests: u32, window: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            max_requests,
            window,
            per_user: false,
        }
    }

    /// Opt into per-user keys.
    pub fn per_user(mut self) -> Self {
        self.per_user = true;
        self
    }

    /// Store key for a client, optionally narrowed to a user.
    pub fn key(&self, client: &str, user: Option<&str>) -> String {
        match user {
            Some(user) if self.per_user => format!("{}:{}:{}", self.prefix, client, user),
            _ => format!("{}:{}", self.prefix, client),
        }
    }
}

// ── Decision ────────────────────────────────────────────────────────────────

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Configured limit.
    pub limit: u32,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Time until the oldest timestamp in the window expires.
    #[serde(skip)]
    pub reset_after: Duration,
}

impl RateDecision {
    /// For rejections, how long the client should wait.
    pub fn retry_after(&self) -> Option<Duration> {
        (!self.allowed).then_some(self.reset_after)
    }

    /// Wall-clock reset time as Unix seconds, rounded up.
    pub fn reset_epoch_secs(&self) -> u64 {
        let reset = SystemTime::now() + self.reset_after;
        reset
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
            .unwrap_or(0)
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct WindowEntry {
    hits: VecDeque<Instant>,
}

impl WindowEntry {
    fn evict(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn reset_after(&self, now: Instant, window: Duration) -> Duration {
        self.hits
            .front()
            .map(|&oldest| (oldest + window).saturating_duration_since(now))
            .unwrap_or(window)
    }
}

/// Shared sliding-window counter store. Cloning shares the store.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, WindowEntry>>,
}

impl RateLimiter {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and record a request for `key` under `profile` at the current instant.
    pub fn check(&self, key: &str, profile: &RateLimitProfile) -> RateDecision {
        self.check_at(key, profile.max_requests, profile.window, Instant::now())
    }

    /// Check and record a request for `key` at `now`.
    pub fn check_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> RateDecision {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                hits: VecDeque::new(),
            });
        entry.evict(now, window);

        let count = u32::try_from(entry.hits.len()).unwrap_or(u32::MAX);
        if count >= limit {
            return RateDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_after: entry.reset_after(now, window),
            };
        }

        entry.hits.push_back(now);
        RateDecision {
            allowed: true,
            limit,
            remaining: limit - count - 1,
            reset_after: entry.reset_after(now, window),
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict expired timestamps everywhere and drop keys left empty.
    /// Returns the number of keys removed.
    pub fn sweep(&self, window: Duration) -> usize {
        self.sweep_at(window, Instant::now())
    }

    /// [`sweep`](Self::sweep) at a chosen instant.
    ///
    /// `window` must be the longest window any profile uses, so that no key
    /// loses timestamps its own profile still counts.
    pub fn sweep_at(&self, window: Duration, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry.evict(now, window);
            !entry.hits.is_empty()
        });
        before.saturating_sub(self.entries.len())
    }

    /// Run [`sweep`](Self::sweep) every `every` on the Tokio runtime.
    pub fn spawn_sweeper(&self, every: Duration, longest_window: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep(longest_window);
                tracing::debug!(removed, remaining = limiter.len(), "rate limit sweep");
            }
        })
    }
}
