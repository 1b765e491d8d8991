//! Fingerprint cache: SHA-256-based change tracking for synced secrets.
//!
//! Lives for the lifetime of the process only. Entries are never evicted and
//! never removed, so a key that disappears from the source keeps its last
//! fingerprint until restart; memory grows with the number of distinct keys
//! ever seen.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use ksync_core::SecretKey;

/// Hex-encoded SHA-256 digest of a secret value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(value: &str) -> Self {
        let mut h = Sha256::new();
        h.update(value.as_bytes());
        Self(hex::encode(h.finalize()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

// Digests of short secrets are guessable, keep them out of logs.
impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}…)", &self.0[..8])
    }
}

/// Map from secret key to the fingerprint of the last value seen for it.
///
/// Every method takes the internal lock exactly once, so each call is atomic
/// on its own. [`FingerprintCache::observe`] combines the lookup and the
/// conditional store under one lock for callers that would otherwise race
/// between the two.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: Mutex<HashMap<SecretKey, Fingerprint>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &SecretKey) -> Option<Fingerprint> {
        self.lock().get(key).cloned()
    }

    /// Record `fingerprint` for `key`, returning the previous entry.
    pub fn store(&self, key: SecretKey, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.lock().insert(key, fingerprint)
    }

    /// Report whether `fingerprint` differs from the cached entry for `key`
    /// (absent counts as different). When it differs and `commit` is set,
    /// the new fingerprint is stored before the lock is released.
    pub fn observe(&self, key: &SecretKey, fingerprint: &Fingerprint, commit: bool) -> bool {
        let mut entries = self.lock();
        if entries.get(key) == Some(fingerprint) {
            return false;
        }
        if commit {
            entries.insert(key.clone(), fingerprint.clone());
        }
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The map stays consistent even if a holder panicked mid-call: every
    // critical section is a single get or insert.
    fn lock(&self) -> MutexGuard<'_, HashMap<SecretKey, Fingerprint>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn equal_values_have_equal_fingerprints() {
        assert_eq!(Fingerprint::of("a"), Fingerprint::of("a"));
        assert_ne!(Fingerprint::of("a"), Fingerprint::of("b"));
        assert_eq!(
            Fingerprint::of("").as_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn debug_shows_only_a_prefix() {
        let rendered = format!("{:?}", Fingerprint::of("a"));
        assert_eq!(rendered, "Fingerprint(ca978112…)");
    }

    #[test]
    fn lookup_and_store() {
        let cache = FingerprintCache::new();
        let key = SecretKey::from("K1");
        assert!(cache.lookup(&key).is_none());
        assert!(cache.store(key.clone(), Fingerprint::of("a")).is_none());
        assert_eq!(cache.lookup(&key), Some(Fingerprint::of("a")));
        assert_eq!(
            cache.store(key.clone(), Fingerprint::of("b")),
            Some(Fingerprint::of("a"))
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn observe_without_commit_leaves_cache_untouched() {
        let cache = FingerprintCache::new();
        let key = SecretKey::from("K1");
        assert!(cache.observe(&key, &Fingerprint::of("a"), false));
        assert!(cache.is_empty());
        assert!(cache.observe(&key, &Fingerprint::of("a"), true));
        assert!(!cache.observe(&key, &Fingerprint::of("a"), true));
        assert!(cache.observe(&key, &Fingerprint::of("b"), false));
        assert_eq!(cache.lookup(&key), Some(Fingerprint::of("a")));
    }

    #[test]
    fn concurrent_observers_see_a_new_value_once() {
        let cache = Arc::new(FingerprintCache::new());
        let key = SecretKey::from("SHARED");
        let fp = Fingerprint::of("v1");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let key = key.clone();
                let fp = fp.clone();
                std::thread::spawn(move || cache.observe(&key, &fp, true))
            })
            .collect();
        let changed = handles
            .into_iter()
            .map(|h| h.join().expect("observer thread"))
            .filter(|changed| *changed)
            .count();

        assert_eq!(changed, 1, "only one observer may classify the value as new");
    }
}
