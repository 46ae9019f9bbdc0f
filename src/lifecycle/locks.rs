//! Identity-keyed lock arena
//!
//! Serializes mutations per resource identity: at most one in-flight
//! lifecycle mutation per `api_id` (or `(product_id, api_id)` pair) at any
//! time, while unrelated identities proceed concurrently. Locks are created
//! on first use and never removed, so a key always maps to the same mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Arena of per-key async mutexes
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mutex for `key`, creating it on first use.
    ///
    /// The returned `Arc` keeps the mutex alive across the guard's lifetime;
    /// callers hold the guard for the whole lifecycle operation and release
    /// it on every exit path, including errors, by dropping it.
    pub fn get(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock arena poisoned");
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Build the key serializing one `(product_id, api_id)` association.
    pub fn pair_key(product_id: &str, api_id: &str) -> String {
        format!("{}\u{1f}{}", product_id, api_id)
    }
}
