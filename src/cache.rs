//! Per-widget suggestion cache keyed by trimmed query text.
//!
//! A hit short-circuits the scheduler and the network entirely. By default
//! entries live as long as the widget; a bounded policy backed by [`moka`]
//! can be configured for long-lived sessions.

use std::collections::HashMap;
use std::time::Duration;

use moka::sync::Cache;

use crate::config::AutocompleteConfig;
use crate::types::AutocompleteResponse;

/// Eviction policy for the suggestion cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Keep every response for the widget's lifetime.
    Unbounded,
    /// Evict by entry count and/or age. A zero field means "no limit".
    Bounded { max_entries: u64, ttl_seconds: u64 },
}

impl CachePolicy {
    pub fn from_config(config: &AutocompleteConfig) -> Self {
        match (config.cache_max_entries, config.cache_ttl_seconds) {
            (0, 0) => Self::Unbounded,
            (max_entries, ttl_seconds) => Self::Bounded {
                max_entries,
                ttl_seconds,
            },
        }
    }
}

enum Store {
    Unbounded(HashMap<String, AutocompleteResponse>),
    Bounded(Cache<String, AutocompleteResponse>),
}

/// Memoised suggestion responses owned by one widget instance.
pub struct SuggestionCache {
    store: Store,
}

impl std::fmt::Debug for SuggestionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.store {
            Store::Unbounded(_) => "unbounded",
            Store::Bounded(_) => "bounded",
        };
        f.debug_struct("SuggestionCache")
            .field("store", &kind)
            .field("len", &self.len())
            .finish()
    }
}

impl SuggestionCache {
    pub fn new(policy: CachePolicy) -> Self {
        let store = match policy {
            CachePolicy::Unbounded => Store::Unbounded(HashMap::new()),
            CachePolicy::Bounded {
                max_entries,
                ttl_seconds,
            } => {
                let mut builder = Cache::builder();
                if max_entries > 0 {
                    builder = builder.max_capacity(max_entries);
                }
                if ttl_seconds > 0 {
                    builder = builder.time_to_live(Duration::from_secs(ttl_seconds));
                }
                Store::Bounded(builder.build())
            }
        };
        Self { store }
    }

    /// Look up the response for a query. The key is trimmed before lookup.
    pub fn get(&self, query: &str) -> Option<AutocompleteResponse> {
        let key = query.trim();
        match &self.store {
            Store::Unbounded(map) => map.get(key).cloned(),
            Store::Bounded(cache) => cache.get(key),
        }
    }

    /// Store the response for a query. The key is trimmed before insertion.
    pub fn put(&mut self, query: &str, response: AutocompleteResponse) {
        let key = query.trim().to_owned();
        match &mut self.store {
            Store::Unbounded(map) => {
                map.insert(key, response);
            }
            Store::Bounded(cache) => cache.insert(key, response),
        }
    }

    /// Approximate number of cached responses.
    pub fn len(&self) -> usize {
        match &self.store {
            Store::Unbounded(map) => map.len(),
            Store::Bounded(cache) => usize::try_from(cache.entry_count()).unwrap_or(usize::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
