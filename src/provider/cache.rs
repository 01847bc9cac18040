//! Model clients shared per credential set.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::ModelClient;

/// Clients kept before the least recently used one is evicted.
pub const DEFAULT_CAPACITY: usize = 32;

/// Caches one client per distinct `(api_key, base_url)` pair.
///
/// Keys are stored as a SHA-256 fingerprint so raw API keys never sit in the
/// map. The cache is bounded: once `capacity` clients are held, adding a new
/// credential set evicts the least recently used one. Cloning the cache
/// shares the underlying map.
#[derive(Clone)]
pub struct ClientCache {
    state: Arc<Mutex<CacheState>>,
    capacity: usize,
}

#[derive(Default)]
struct CacheState {
    clients: HashMap<String, CachedClient>,
    tick: u64,
}

struct CachedClient {
    client: Arc<dyn ModelClient>,
    last_used: u64,
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` clients (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached client for these credentials, creating it on first use.
    pub fn get_or_insert_with<F>(
        &self,
        api_key: &str,
        base_url: Option<&str>,
        make: F,
    ) -> Arc<dyn ModelClient>
    where
        F: FnOnce() -> Arc<dyn ModelClient>,
    {
        let key = fingerprint(api_key, base_url);
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.tick += 1;
        let now = state.tick;

        if let Some(cached) = state.clients.get_mut(&key) {
            cached.last_used = now;
            return Arc::clone(&cached.client);
        }

        if state.clients.len() >= self.capacity {
            let oldest = state
                .clients
                .iter()
                .min_by_key(|(_, cached)| cached.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                state.clients.remove(&oldest);
                debug!(capacity = self.capacity, "evicted least recently used model client");
            }
        }

        let client = make();
        state.clients.insert(
            key,
            CachedClient {
                client: Arc::clone(&client),
                last_used: now,
            },
        );
        client
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clients
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fingerprint(api_key: &str, base_url: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update([0u8]);
    hasher.update(base_url.unwrap_or_default().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
