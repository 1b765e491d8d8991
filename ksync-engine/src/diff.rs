//! Change detection: which fetched secrets need to be written.

use std::fmt;
use std::str::FromStr;

use ksync_core::{Secret, SecretKey};

use crate::fingerprint::{Fingerprint, FingerprintCache};

/// When a changed secret's fingerprint is committed to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitPolicy {
    /// Commit while diffing, before the write is attempted.
    ///
    /// If the write then fails the cache already holds the new fingerprint,
    /// so the secret is skipped on every later pass until its value changes
    /// again.
    #[default]
    Optimistic,
    /// Commit only after the upsert succeeded. Failed secrets are retried on
    /// the next pass.
    Confirmed,
}

impl fmt::Display for CommitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitPolicy::Optimistic => write!(f, "optimistic"),
            CommitPolicy::Confirmed => write!(f, "confirmed"),
        }
    }
}

impl FromStr for CommitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(format!(
                "unknown commit policy '{other}'; expected: optimistic, confirmed"
            )),
        }
    }
}

/// A secret whose value differs from what the cache last recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub secret: Secret,
    pub fingerprint: Fingerprint,
}

/// Changed secrets of one pass, in the order the source returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SecretKey> {
        self.changes.iter().map(|c| &c.secret.key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Compare every secret against `cache` and collect the changed ones.
///
/// Only the value is fingerprinted: a secret whose note changed but whose
/// value did not is not a change.
pub fn detect_changes(
    cache: &FingerprintCache,
    secrets: Vec<Secret>,
    policy: CommitPolicy,
) -> ChangeSet {
    let commit = policy == CommitPolicy::Optimistic;
    let changes = secrets
        .into_iter()
        .filter_map(|secret| {
            let fingerprint = Fingerprint::of(&secret.value);
            if cache.observe(&secret.key, &fingerprint, commit) {
                tracing::debug!(key = %secret.key, "secret changed");
                Some(Change {
                    secret,
                    fingerprint,
                })
            } else {
                None
            }
        })
        .collect();
    ChangeSet { changes }
}
