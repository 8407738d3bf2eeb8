//! Db properties caching.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::document::Document;
use crate::observability::metrics;

/// A cached properties document.
#[derive(Debug, Clone)]
struct CachedProps {
    props: Document,
    inserted_at: Instant,
}

/// Per-db slot. `generation` counts invalidations and outlives the cached value.
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    cached: Option<CachedProps>,
}

/// A thread-safe cache of db properties keyed by db name.
///
/// Cloning is cheap and clones share the same entries. A reader takes the
/// generation before going to the backend and hands it back to `put`, so a
/// value read before a write can never land after that write's invalidation.
#[derive(Clone)]
pub struct DbPropsCache {
    inner: Arc<DashMap<String, Slot>>,
    ttl: Duration,
    enabled: bool,
}

impl DbPropsCache {
    /// Create a new empty cache.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs),
            enabled: config.enabled,
        }
    }

    /// Get the cached properties of `db_name`, if present and fresh.
    pub fn get(&self, db_name: &str) -> Option<Document> {
        if !self.enabled {
            return None;
        }

        let hit = self
            .inner
            .get(db_name)
            .and_then(|slot| slot.cached.as_ref().filter(|c| c.inserted_at.elapsed() < self.ttl).map(|c| c.props.clone()));

        match hit {
            Some(props) => {
                metrics::record_cache_event("hit");
                Some(props)
            }
            None => {
                // drop an expired value, if that is why we missed
                if let Some(mut slot) = self.inner.get_mut(db_name) {
                    if slot.cached.as_ref().is_some_and(|c| c.inserted_at.elapsed() >= self.ttl) {
                        slot.cached = None;
                    }
                }
                metrics::record_cache_event("miss");
                None
            }
        }
    }

    /// Current invalidation generation of `db_name`.
    pub fn generation(&self, db_name: &str) -> u64 {
        self.inner.get(db_name).map(|slot| slot.generation).unwrap_or(0)
    }

    /// Store the properties of `db_name` if it was not invalidated since
    /// `generation` was read. Returns whether the value was stored.
    pub fn put(&self, db_name: &str, generation: u64, props: Document) -> bool {
        if !self.enabled {
            return false;
        }

        let cached = CachedProps {
            props,
            inserted_at: Instant::now(),
        };
        match self.inner.entry(db_name.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().generation != generation {
                    tracing::debug!(db = %db_name, "Discarded db properties read before an invalidation");
                    return false;
                }
                entry.get_mut().cached = Some(cached);
            }
            Entry::Vacant(entry) => {
                if generation != 0 {
                    return false;
                }
                entry.insert(Slot {
                    generation,
                    cached: Some(cached),
                });
            }
        }
        true
    }

    /// Drop the value for `db_name` so the next read goes to the backend.
    pub fn invalidate(&self, db_name: &str) {
        let mut slot = self.inner.entry(db_name.to_string()).or_default();
        slot.generation += 1;
        if slot.cached.take().is_some() {
            tracing::debug!(db = %db_name, "Invalidated cached db properties");
        }
        drop(slot);
        metrics::record_cache_event("invalidate");
    }

    /// Number of values currently held (fresh or not).
    pub fn len(&self) -> usize {
        self.inner.iter().filter(|slot| slot.cached.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
