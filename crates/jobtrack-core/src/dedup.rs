// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Time-bounded deduplication cache.
//!
//! Maps `(owner, kind)` to the tracker id of the in-flight job so repeated
//! `queue` calls return the existing id instead of creating duplicate
//! records. Entries expire a fixed TTL after the write regardless of access,
//! which bounds memory and self-heals a missed invalidation.
//!
//! This is a process-local optimization, not a lock: two callers racing past
//! the cache check can both insert records, and a second engine instance
//! knows nothing about this one's entries.

use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry {
    tracker_id: String,
    stored_at: Instant,
}

/// In-process `(owner, kind) → tracker id` cache with a fixed TTL.
pub struct DedupCache {
    entries: DashMap<(String, String), Entry>,
    ttl: Duration,
}

impl DedupCache {
    /// Create a cache whose entries expire `ttl` after they are written.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// The tracker id of the in-flight job for `(owner, kind)`, if any.
    pub fn get(&self, owner_id: &str, kind: &str) -> Option<String> {
        let key = (owner_id.to_string(), kind.to_string());
        let expired = match self.entries.get(&key) {
            Some(entry) => {
                if entry.stored_at.elapsed() < self.ttl {
                    return Some(entry.tracker_id.clone());
                }
                true
            }
            None => false,
        };
        // The shard guard must be dropped before removing the key.
        if expired {
            self.entries.remove(&key);
        }
        None
    }

    /// Record `tracker_id` as the in-flight job for `(owner, kind)`.
    ///
    /// Also sweeps expired entries so long-idle keys do not accumulate.
    pub fn put(&self, owner_id: &str, kind: &str, tracker_id: &str) {
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        self.entries.insert(
            (owner_id.to_string(), kind.to_string()),
            Entry {
                tracker_id: tracker_id.to_string(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for `(owner, kind)`, if present.
    pub fn invalidate(&self, owner_id: &str, kind: &str) {
        self.entries
            .remove(&(owner_id.to_string(), kind.to_string()));
    }
}
