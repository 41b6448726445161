// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the japikeys project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bounded-staleness cache for serialized JWKS bodies
//!
//! Keyed by kid. Entries are whole serialized response bodies, inserted
//! atomically, so a concurrent reader sees either a complete entry or
//! none; races to populate the same kid resolve last-writer-wins.
//! Unrelated kids live in different shards of the underlying map and do
//! not serialize on a common lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// A kid-keyed cache of serialized JWKS documents
///
/// The maximum age is configured in seconds; zero disables caching
/// entirely and negative values are clamped to zero. Within the window a
/// rotated or revoked key may still be served; with a zero max age every
/// request reflects the current store state.
pub struct JwksCache {
    entries: DashMap<Uuid, CacheEntry>,
    max_age: Duration,
}

struct CacheEntry {
    body: Arc<String>,
    inserted_at: Instant,
}

impl JwksCache {
    /// Create a cache with the given maximum entry age in seconds.
    ///
    /// Negative values clamp to zero; zero disables caching.
    pub fn new(max_age_secs: i64) -> Self {
        JwksCache {
            entries: DashMap::new(),
            max_age: Duration::from_secs(max_age_secs.max(0) as u64),
        }
    }

    /// Whether caching is disabled (max age of zero).
    pub fn is_disabled(&self) -> bool {
        self.max_age.is_zero()
    }

    /// Return the cached body for a kid if present and fresh.
    pub fn get(&self, kid: &Uuid) -> Option<Arc<String>> {
        if self.max_age.is_zero() {
            return None;
        }
        {
            let entry = self.entries.get(kid)?;
            if entry.inserted_at.elapsed() < self.max_age {
                return Some(Arc::clone(&entry.body));
            }
        }
        // Expired; drop it so the map does not accumulate dead entries.
        self.entries
            .remove_if(kid, |_, entry| entry.inserted_at.elapsed() >= self.max_age);
        None
    }

    /// Store a freshly computed body for a kid.
    ///
    /// Returns the shared body so the caller can serve it without another
    /// clone. A no-op (beyond the wrap) when caching is disabled.
    pub fn put(&self, kid: Uuid, body: String) -> Arc<String> {
        let body = Arc::new(body);
        if !self.max_age.is_zero() {
            self.entries.insert(
                kid,
                CacheEntry {
                    body: Arc::clone(&body),
                    inserted_at: Instant::now(),
                },
            );
        }
        body
    }
}
