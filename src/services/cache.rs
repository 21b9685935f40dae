//! Injected key/value cache
//!
//! Stands in for the client-durable store holding `selectedRestaurant` and
//! `ip_geolocation`. Writes are idempotent, so concurrent writers racing on
//! one key only ever store equivalent values.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Cache key for the customer's chosen restaurant
pub const SELECTED_RESTAURANT_KEY: &str = "selectedRestaurant";

/// Cache key for the last IP geolocation result
pub const IP_GEOLOCATION_KEY: &str = "ip_geolocation";

/// Minimal key/value store interface
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value`; `ttl: None` keeps it until removed
    fn set(&self, key: &str, value: String, ttl: Option<Duration>);

    fn remove(&self, key: &str);
}

/// Read and decode a JSON entry. Undecodable entries read as absent.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring undecodable cache entry '{}': {}", key, e);
            None
        }
    }
}

/// Encode and store a JSON entry
pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T, ttl: Option<Duration>) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, raw, ttl),
        Err(e) => warn!("Failed to encode cache entry '{}': {}", key, e),
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-memory store with per-entry expiry
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries (call periodically to free memory)
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .lock()
            .retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        match entry.expires_at {
            Some(at) if at <= Instant::now() => None,
            _ => Some(entry.value.clone()),
        }
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .insert(key.to_string(), Entry { value, expires_at });
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
