//! Keyed in-flight tracking
//!
//! A key is held by at most one guard at a time. Dropping the guard
//! releases the key, including on early returns and errors.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of keys with work in progress
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a key, or `None` if it is already held
    pub fn try_acquire(&self, key: &str) -> Option<InFlightGuard> {
        if !lock(&self.keys).insert(key.to_string()) {
            return None;
        }

        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }
}

/// Holds a key until dropped
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

// The set stays consistent even if a holder panicked
fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    keys.lock().unwrap_or_else(PoisonError::into_inner)
}
