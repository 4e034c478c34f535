//! Read-through / write-through cache in front of a timer store
//!
//! Entries hold the serialized record, mirroring an external key-value cache.
//! The cache is never authoritative: expired entries, misses and payloads that
//! fail to decode all fall back to the wrapped store.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{StoreError, TimerStore};
use crate::state::{TimerState, UserId};

/// Default lifetime of a cached record
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

/// [`TimerStore`] decorator caching records in process memory
pub struct CachedStore {
    inner: Arc<dyn TimerStore>,
    entries: DashMap<UserId, CacheEntry>,
    ttl: Duration,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn TimerStore>, ttl: Duration) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of live entries, for diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn put(&self, state: &TimerState) {
        match serde_json::to_string(state) {
            Ok(payload) => {
                self.entries.insert(
                    state.user_id,
                    CacheEntry {
                        payload,
                        expires_at: Instant::now() + self.ttl,
                    },
                );
            }
            Err(e) => warn!("Failed to cache timer state for user {}: {}", state.user_id, e),
        }
    }

    /// Cached record if present, fresh and decodable
    fn cached(&self, user_id: UserId) -> Option<TimerState> {
        let decoded = {
            let entry = self.entries.get(&user_id)?;
            if entry.expires_at <= Instant::now() {
                debug!("Cache entry for user {} expired", user_id);
                None
            } else {
                match serde_json::from_str::<TimerState>(&entry.payload) {
                    Ok(state) => Some(state),
                    Err(e) => {
                        warn!("Discarding corrupt cache entry for user {}: {}", user_id, e);
                        None
                    }
                }
            }
        };

        if decoded.is_none() {
            self.entries.remove(&user_id);
        }
        decoded
    }

    #[cfg(test)]
    fn insert_raw(&self, user_id: UserId, payload: &str, ttl: Duration) {
        self.entries.insert(
            user_id,
            CacheEntry {
                payload: payload.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl TimerStore for CachedStore {
    fn load(&self, user_id: UserId) -> Result<Option<TimerState>, StoreError> {
        if let Some(state) = self.cached(user_id) {
            return Ok(Some(state));
        }

        let loaded = self.inner.load(user_id)?;
        if let Some(state) = &loaded {
            self.put(state);
        }
        Ok(loaded)
    }

    fn save(&self, state: &TimerState) -> Result<(), StoreError> {
        self.invalidate_cache(state.user_id);
        self.inner.save(state)?;
        self.put(state);
        Ok(())
    }

    fn delete(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.invalidate_cache(user_id);
        self.inner.delete(user_id)
    }

    fn running(&self) -> Result<Vec<TimerState>, StoreError> {
        self.inner.running()
    }

    fn invalidate_cache(&self, user_id: UserId) {
        self.entries.remove(&user_id);
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}
