// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Response Cache
 * Memoized GET responses with read-time TTL and bulk oldest-first eviction
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use crate::types::HeaderMap;

/// Default number of resident entries
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default time-to-live
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Share of entries removed when a write hits capacity
const EVICTION_FRACTION: f64 = 0.25;

/// A memoized response
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status_code: u16,
    pub body: String,
    pub headers: HeaderMap,
    pub final_url: String,
    pub cached_at: Instant,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    /// Insertion order; ties on `cached_at` are common on coarse clocks
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

/// Response cache shared by every task using one executor.
///
/// Reads never promote an entry: eviction order is insertion order only.
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
            ttl,
        }
    }

    /// Deterministic key for `(normalized url, method, sorted params)`.
    ///
    /// Query parameters already present in `url` are merged with `params`
    /// before sorting, so `?b=2&a=1` and `?a=1` + `[("b","2")]` collide.
    pub fn key(method: &str, url: &str, params: &[(String, String)]) -> String {
        Self::key_for(method, url, params, true)
    }

    /// Like [`ResponseCache::key`], but a request that does not follow
    /// redirects gets its own key: its response is the 3xx itself.
    pub fn key_for(method: &str, url: &str, params: &[(String, String)], follow_redirects: bool) -> String {
        let mut pairs: Vec<(String, String)> = params.to_vec();

        let base = match Url::parse(url.trim()) {
            Ok(mut parsed) => {
                pairs.extend(
                    parsed
                        .query_pairs()
                        .map(|(k, v)| (k.into_owned(), v.into_owned())),
                );
                parsed.set_query(None);
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => url.trim().split('#').next().unwrap_or_default().to_string(),
        };

        pairs.sort();

        let mut hasher = Sha256::new();
        hasher.update(method.to_ascii_uppercase().as_bytes());
        hasher.update(b"\n");
        hasher.update(base.as_bytes());
        if !follow_redirects {
            hasher.update(b"\nredirect=manual");
        }
        for (k, v) in &pairs {
            hasher.update(b"\n");
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Fresh entry for `key`, or `None` if absent or older than the TTL.
    /// Expired entries stay resident until a write evicts them.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let inner = self.inner.lock();
        let slot = inner.slots.get(key)?;
        if slot.entry.cached_at.elapsed() > self.ttl {
            return None;
        }
        Some(slot.entry.clone())
    }

    pub fn put(&self, key: String, entry: CacheEntry) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock();

        if !inner.slots.contains_key(&key) && inner.slots.len() >= self.capacity {
            let evicted = Self::evict_oldest(&mut inner);
            debug!("[Cache] Capacity {} reached, evicted {} oldest entries", self.capacity, evicted);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.slots.insert(key, Slot { entry, seq });
    }

    /// Remove `floor(len * 0.25)` entries by insertion order (at least one)
    fn evict_oldest(inner: &mut Inner) -> usize {
        let count = ((inner.slots.len() as f64 * EVICTION_FRACTION).floor() as usize).max(1);

        let mut by_age: Vec<(u64, String)> = inner
            .slots
            .iter()
            .map(|(key, slot)| (slot.seq, key.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, key) in by_age.into_iter().take(count) {
            inner.slots.remove(&key);
        }

        count
    }

    pub fn clear(&self) {
        self.inner.lock().slots.clear();
    }

    /// Resident entries, including expired ones
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is still stored, regardless of freshness
    pub fn is_resident(&self, key: &str) -> bool {
        self.inner.lock().slots.contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
