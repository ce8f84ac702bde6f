// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies one acquisition of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcquisitionToken(u64);

#[derive(Debug, Default)]
struct LockState {
    next_token: u64,
    held: HashMap<String, AcquisitionToken>,
}

/// In-memory single-flight lock keyed by entity id. Nothing is persisted, a restarted process
/// starts with every key released.
#[derive(Debug, Clone, Default)]
pub struct KeyedLock {
    state: Arc<Mutex<LockState>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        // The critical sections never panic halfway through an update
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take the key if nobody holds it. The key is released when the guard drops.
    pub fn try_acquire(&self, key: &str) -> Option<KeyGuard> {
        let mut state = self.state();
        if state.held.contains_key(key) {
            return None;
        }

        state.next_token += 1;
        let token = AcquisitionToken(state.next_token);
        state.held.insert(key.to_string(), token);

        Some(KeyGuard {
            key: key.to_string(),
            token,
            lock: self.clone(),
        })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.state().held.contains_key(key)
    }

    pub fn held_count(&self) -> usize {
        self.state().held.len()
    }

    fn release(&self, key: &str, token: AcquisitionToken) {
        let mut state = self.state();
        if state.held.get(key) == Some(&token) {
            state.held.remove(key);
        }
    }
}

/// Proof of holding a key in a [`KeyedLock`]
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    token: AcquisitionToken,
    lock: KeyedLock,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> AcquisitionToken {
        self.token
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.lock.release(&self.key, self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight_per_key() {
        let lock = KeyedLock::new();
        let guard = lock.try_acquire("ticket-1").expect("free key");
        assert!(lock.try_acquire("ticket-1").is_none());
        assert!(lock.is_held("ticket-1"));

        drop(guard);
        assert!(!lock.is_held("ticket-1"));
        assert!(lock.try_acquire("ticket-1").is_some());
    }

    #[test]
    fn test_keys_are_independent() {
        let lock = KeyedLock::new();
        let a = lock.try_acquire("ticket-1").unwrap();
        let b = lock.try_acquire("draw-1").unwrap();
        assert_eq!(lock.held_count(), 2);
        assert_ne!(a.token(), b.token());
        assert_eq!(b.key(), "draw-1");
    }

    #[test]
    fn test_tokens_are_not_reused() {
        let lock = KeyedLock::new();
        let first = lock.try_acquire("ticket-1").unwrap().token();
        let second = lock.try_acquire("ticket-1").unwrap().token();
        assert_ne!(first, second);
        assert_eq!(lock.held_count(), 0);
    }
}
