// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owned, clock-driven cache for the decrypted credential set.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use credvault_core::Clock;

use crate::record::LoadedCredentials;

struct CacheEntry {
    value: Arc<LoadedCredentials>,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    /// Bumped by every `clear`. A load that started before a clear must not
    /// repopulate the slot with what it read.
    generation: u64,
}

/// Holds at most one decrypted credential set with an expiry.
///
/// Only the vault populates it (after a verified load) and clears it (on
/// store). Expired entries are dropped on the next read.
pub struct CredentialCache {
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot>,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("populated", &self.is_populated())
            .finish()
    }
}

impl CredentialCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slot: Mutex::new(Slot::default()),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The cached set, if present and not yet expired.
    pub fn get(&self) -> Option<Arc<LoadedCredentials>> {
        let now = self.clock.now();
        let mut slot = self.slot();
        match slot.entry.as_ref() {
            Some(entry) if now < entry.expires_at => Some(Arc::clone(&entry.value)),
            Some(_) => {
                slot.entry = None;
                None
            }
            None => None,
        }
    }

    pub fn put(&self, value: Arc<LoadedCredentials>, ttl: Duration) {
        let entry = self.entry(value, ttl);
        self.slot().entry = Some(entry);
    }

    /// Current invalidation generation. Read it before fetching the value
    /// that will later be passed to [`put_if_generation`](Self::put_if_generation).
    pub fn generation(&self) -> u64 {
        self.slot().generation
    }

    /// Store `value` only if no `clear` happened since `generation` was
    /// read. Returns whether the value was stored.
    pub fn put_if_generation(
        &self,
        generation: u64,
        value: Arc<LoadedCredentials>,
        ttl: Duration,
    ) -> bool {
        let entry = self.entry(value, ttl);
        let mut slot = self.slot();
        if slot.generation != generation {
            return false;
        }
        slot.entry = Some(entry);
        true
    }

    pub fn clear(&self) {
        let mut slot = self.slot();
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
    }

    pub fn is_populated(&self) -> bool {
        let now = self.clock.now();
        self.slot()
            .entry
            .as_ref()
            .is_some_and(|entry| now < entry.expires_at)
    }

    fn entry(&self, value: Arc<LoadedCredentials>, ttl: Duration) -> CacheEntry {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        CacheEntry { value, expires_at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CredentialRecord, NewCredentials};
    use credvault_core::Environment;
    use credvault_test_utils::ManualClock;
    use secrecy::SecretString;

    fn loaded() -> Arc<LoadedCredentials> {
        let new = NewCredentials {
            api_key: SecretString::from("re_Cache_Key_0123456789".to_string()),
            environment: Environment::Development,
            rotation_schedule: "monthly".to_string(),
            last_rotated: chrono::Utc::now(),
        };
        Arc::new(CredentialRecord::seal(&new).project())
    }

    #[test]
    fn entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = CredentialCache::new(clock.clone());
        assert!(cache.get().is_none());

        cache.put(loaded(), Duration::from_secs(60));
        assert!(cache.get().is_some());
        assert!(cache.is_populated());

        clock.advance(Duration::from_secs(59));
        assert!(cache.get().is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get().is_none());
        assert!(!cache.is_populated());
    }

    #[test]
    fn clear_drops_the_entry() {
        let cache = CredentialCache::new(Arc::new(ManualClock::starting_now()));
        cache.put(loaded(), Duration::from_secs(60));
        cache.clear();
        assert!(cache.get().is_none());
    }

    #[test]
    fn put_after_clear_with_stale_generation_is_ignored() {
        let cache = CredentialCache::new(Arc::new(ManualClock::starting_now()));
        let before = cache.generation();
        cache.clear();

        assert!(!cache.put_if_generation(before, loaded(), Duration::from_secs(60)));
        assert!(cache.get().is_none());

        let current = cache.generation();
        assert!(cache.put_if_generation(current, loaded(), Duration::from_secs(60)));
        assert!(cache.get().is_some());
    }

    #[test]
    fn zero_ttl_is_never_served() {
        let cache = CredentialCache::new(Arc::new(ManualClock::starting_now()));
        cache.put(loaded(), Duration::ZERO);
        assert!(cache.get().is_none());
    }
}
