// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for claims-history lookups.
//!
//! Claims history changes rarely; cache the per-address response to avoid
//! hammering the rewards API on the most common query pattern.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::api::ClaimRecord;

struct CacheEntry {
    records: Vec<ClaimRecord>,
    inserted_at: Instant,
}

/// In-process LRU cache for hot claims-history lookups.
pub struct ClaimsCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ClaimsCache {
    /// - `capacity`: max number of addresses to cache.
    /// - `ttl`: time-to-live for each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Cached history for an address; `None` if absent or expired.
    pub fn get(&self, address: &str) -> Option<Vec<ClaimRecord>> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(address) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.records.clone());
            }
            cache.pop(address);
        }
        None
    }

    pub fn put(&self, address: &str, records: Vec<ClaimRecord>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                address.to_string(),
                CacheEntry {
                    records,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the cached history for an address (e.g. after a new claim).
    pub fn invalidate(&self, address: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(address);
        }
    }
}
