//! In-process price cache
//!
//! Entries move through three tiers as they age:
//!
//! ```text
//! stored_at ──── fresh ────▶ fresh_until ──── stale ────▶ stored_at + stale_window ── expired
//!   served directly            served only when a refetch fails          treated as a miss
//! ```
//!
//! Values are held behind `Arc` and never mutated once stored, so a reader
//! can keep using an entry after the map lock is released. The map itself is
//! synchronized by the owner.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Default fresh TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default stale-usability window, measured from the original store time
pub const DEFAULT_STALE_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: Arc<V>,
    pub stored_at: Instant,
    pub fresh_until: Instant,
    stale_until: Instant,
}

impl<V> CacheEntry<V> {
    /// `None` once the entry is past its stale window.
    pub fn freshness(&self, now: Instant) -> Option<Freshness> {
        if now < self.fresh_until {
            Some(Freshness::Fresh)
        } else if now < self.stale_until {
            Some(Freshness::Stale)
        } else {
            None
        }
    }
}

pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
    stale_window: Duration,
}

impl<V> TtlCache<V> {
    /// A `stale_window` shorter than `ttl` is raised to `ttl` (no stale tier).
    pub fn new(ttl: Duration, stale_window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            stale_window: stale_window.max(ttl),
        }
    }

    /// Cache whose entries are never served stale.
    pub fn fresh_only(ttl: Duration) -> Self {
        Self::new(ttl, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stale_window(&self) -> Duration {
        self.stale_window
    }

    pub fn get_fresh(&self, key: &str, now: Instant) -> Option<Arc<V>> {
        match self.get_usable(key, now) {
            Some((value, Freshness::Fresh)) => Some(value),
            _ => None,
        }
    }

    /// Fresh or stale value for `key`; expired entries count as absent.
    pub fn get_usable(&self, key: &str, now: Instant) -> Option<(Arc<V>, Freshness)> {
        let entry = self.entries.get(key)?;
        let freshness = entry.freshness(now)?;
        Some((entry.value.clone(), freshness))
    }

    /// Store `value`, replacing any previous entry wholesale.
    pub fn insert(&mut self, key: String, value: Arc<V>, now: Instant) {
        self.purge_expired(now);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                fresh_until: now + self.ttl,
                stale_until: now + self.stale_window,
            },
        );
    }

    /// Drop entries past their stale window. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.freshness(now).is_some());
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Order-independent key: uppercase, sorted, de-duplicated, comma-joined.
pub fn cache_key(symbols: &[String]) -> String {
    let mut normalized: Vec<String> = symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized.join(",")
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Batch entries currently held (any tier)
    pub price_entries: usize,

    pub detail_entries: usize,

    /// Fetch cycles currently running
    pub in_flight: usize,

    pub ttl_seconds: u64,

    pub stale_window_seconds: u64,
}
