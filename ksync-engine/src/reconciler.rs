//! One reconciliation pass: fetch, diff, apply.
//!
//! ## Pass states
//!
//! `Idle → Fetching → Diffing → Applying → Idle`. A failed fetch ends the
//! pass in `Fetching`. `Applying` always runs, even for an empty change set,
//! and attempts every change regardless of individual failures. The deadline
//! can end the pass in `Fetching` or `Applying`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::time::Instant;

use ksync_core::{Scope, SecretKey, SecretsSource, TargetWriter, VariableSpec};

use crate::deadline::Deadline;
use crate::diff::{detect_changes, CommitPolicy};
use crate::error::{PassError, UpsertError};
use crate::fingerprint::FingerprintCache;
use crate::upsert::{upsert, UpsertOutcome};

/// Prefix of the description stamped on every synced variable.
pub const SYNC_STAMP: &str = "Synced by komodo-secrets-sync at";

/// Description for variables written by a pass that started at `at`.
pub fn sync_description(at: DateTime<Utc>) -> String {
    format!(
        "{SYNC_STAMP} {}",
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Where a pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Fetching,
    Diffing,
    Applying,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassState::Idle => write!(f, "idle"),
            PassState::Fetching => write!(f, "fetching"),
            PassState::Diffing => write!(f, "diffing"),
            PassState::Applying => write!(f, "applying"),
        }
    }
}

/// A secret that could not be written during a pass.
#[derive(Debug, Clone)]
pub struct SecretFailure {
    pub key: SecretKey,
    pub error: UpsertError,
}

/// Aggregate outcome of a completed pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Secrets returned by the source.
    pub scanned: usize,
    /// Secrets whose fingerprint changed.
    pub modified: usize,
    /// Changed secrets created on the target.
    pub created: usize,
    /// Changed secrets that already existed and were updated.
    pub updated: usize,
    pub failures: Vec<SecretFailure>,
    pub elapsed: Duration,
}

impl PassReport {
    pub fn synced(&self) -> usize {
        self.created + self.updated
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Settings fixed for the lifetime of a [`Reconciler`].
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    pub scope: Scope,
    pub commit_policy: CommitPolicy,
}

/// Owns the fingerprint cache and drives passes against the collaborators.
pub struct Reconciler {
    config: ReconcilerConfig,
    source: Arc<dyn SecretsSource>,
    writer: Arc<dyn TargetWriter>,
    cache: Arc<FingerprintCache>,
}

impl Reconciler {
    pub fn new(
        config: ReconcilerConfig,
        source: Arc<dyn SecretsSource>,
        writer: Arc<dyn TargetWriter>,
        cache: Arc<FingerprintCache>,
    ) -> Self {
        Self {
            config,
            source,
            writer,
            cache,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    /// Run one pass under `deadline`.
    ///
    /// Per-secret write failures are collected in the report; only a failed
    /// fetch, an elapsed deadline or a shutdown end the pass with an error.
    pub async fn reconcile(&self, deadline: &Deadline) -> Result<PassReport, PassError> {
        let started = Instant::now();
        let policy = self.config.commit_policy;

        tracing::debug!(state = %PassState::Fetching, scope = %self.config.scope, "pass state");
        let source = self.source.clone();
        let scope = self.config.scope.clone();
        let secrets = deadline
            .run_blocking(PassState::Fetching, move || source.fetch_all(&scope))
            .await?
            .map_err(|source| PassError::Fetch {
                source_name: self.source.name().to_string(),
                source,
            })?;

        tracing::debug!(state = %PassState::Diffing, "pass state");
        let scanned = secrets.len();
        let changes = detect_changes(&self.cache, secrets, policy);
        tracing::info!(
            total = scanned,
            modified = changes.len(),
            "reconciliation scan"
        );

        tracing::debug!(state = %PassState::Applying, "pass state");
        let description = sync_description(Utc::now());
        let mut report = PassReport {
            scanned,
            modified: changes.len(),
            ..PassReport::default()
        };

        for change in changes {
            let writer = self.writer.clone();
            let spec = VariableSpec::from_secret(&change.secret, description.as_str());
            let outcome = deadline
                .run_blocking(PassState::Applying, move || upsert(writer.as_ref(), &spec))
                .await?;

            match outcome {
                Ok(outcome) => {
                    if policy == CommitPolicy::Confirmed {
                        self.cache
                            .store(change.secret.key.clone(), change.fingerprint);
                    }
                    match outcome {
                        UpsertOutcome::Created => report.created += 1,
                        UpsertOutcome::Updated => report.updated += 1,
                    }
                    tracing::debug!(key = %change.secret.key, outcome = ?outcome, "secret synced");
                }
                Err(error) => {
                    tracing::error!(
                        key = %change.secret.key,
                        step = %error.step,
                        partial = error.is_partial(),
                        error = %error.source,
                        "failed to sync secret",
                    );
                    report.failures.push(SecretFailure {
                        key: change.secret.key,
                        error,
                    });
                }
            }
        }

        report.elapsed = started.elapsed();
        if report.modified > 0 {
            tracing::info!(
                synced = report.synced(),
                failed = report.failed(),
                "sync completed"
            );
        }
        tracing::debug!(state = %PassState::Idle, elapsed_ms = report.elapsed.as_millis(), "pass state");
        Ok(report)
    }
}
