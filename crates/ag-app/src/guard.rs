//! In-flight guards.
//!
//! A guard is acquired synchronously before the first await and released on
//! drop, so it is released on success, failure and cancellation alike.
//! Acquisition never waits: a second caller simply gets `None`.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Exclusive hold on a boolean in-flight flag.
pub(crate) struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Exclusive hold on one key of an in-flight set.
pub(crate) struct KeyGuard<'a, K: Eq + Hash> {
    set: &'a Mutex<HashSet<K>>,
    key: K,
}

impl<'a, K: Eq + Hash + Clone> KeyGuard<'a, K> {
    pub(crate) fn acquire(set: &'a Mutex<HashSet<K>>, key: &K) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.clone());
        inserted.then(|| Self {
            set,
            key: key.clone(),
        })
    }
}

impl<K: Eq + Hash> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

pub(crate) fn contains<K: Eq + Hash>(set: &Mutex<HashSet<K>>, key: &K) -> bool {
    set.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains(key)
}
