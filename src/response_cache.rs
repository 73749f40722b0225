//! A thread-safe in-memory cache of evaluation responses with a fixed time-to-live.
use std::{sync::Arc, time::Duration};

use moka::sync::Cache;

use crate::EvaluationResponse;

/// `ResponseCache` stores evaluation responses keyed by cache key. Entries expire `ttl` after
/// insertion and the cache holds at most `max_capacity` entries.
///
/// A zero `ttl` disables caching: writes are discarded.
#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    cache: Cache<String, Arc<EvaluationResponse>>,
}

impl ResponseCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration, max_capacity: u64) -> ResponseCache {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();

        ResponseCache { ttl, cache }
    }

    /// Time-to-live of cache entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a non-expired response stored under `key`.
    pub fn get(&self, key: &str) -> Option<Arc<EvaluationResponse>> {
        self.cache.get(key)
    }

    /// Store `response` under `key`, replacing any previous entry.
    pub fn put(&self, key: String, response: Arc<EvaluationResponse>) {
        if self.ttl.is_zero() {
            return;
        }
        self.cache.insert(key, response);
    }

    /// Number of stored entries.
    ///
    /// Runs pending maintenance first, so expired and evicted entries are not counted.
    pub fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
