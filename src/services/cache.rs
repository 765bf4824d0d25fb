// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TTL response cache for upstream payloads.
//!
//! Keys are fingerprints of (logical endpoint, sorted parameter set).
//! Expiry is lazy: an entry past its deadline is treated as a miss on read
//! and removed then. No background sweep is required; the cache is purely
//! an optimization and callers must behave identically without it.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Process-local read-through cache.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key; expired entries count as misses and are evicted.
    pub fn get(&self, key: &str) -> Option<Value> {
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => None,
            None => return None,
        };

        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    /// Store a value under a key with the given TTL.
    pub fn insert(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every expired entry. Optional maintenance, never required for
    /// correctness.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of physically present entries (including not-yet-evicted
    /// expired ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a cache key from an endpoint name and its parameters.
///
/// Absent parameters are skipped and the rest are sorted by name, so two
/// requests that differ only in parameter order share a fingerprint.
pub fn fingerprint(endpoint: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(k, v)| v.map(|v| (*k, v)))
        .collect();
    present.sort_by_key(|(k, _)| *k);

    let mut key = String::from(endpoint);
    for (name, value) in present {
        key.push_str(&format!("&{}={}", name, value));
    }
    key
}
