//! # ksync-engine
//!
//! Fingerprint-gated reconciliation of secrets into target variables.
//!
//! A [`Reconciler`] runs one pass per call to [`Reconciler::reconcile`]:
//! fetch every secret from the source, keep the ones whose
//! [`Fingerprint`] changed since the last pass, and upsert each of them on
//! the target. Every blocking collaborator call is bounded by a
//! [`Deadline`].

pub mod deadline;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod reconciler;
pub mod upsert;

pub use deadline::Deadline;
pub use diff::{detect_changes, Change, ChangeSet, CommitPolicy};
pub use error::{PassError, UpsertError};
pub use fingerprint::{Fingerprint, FingerprintCache};
pub use reconciler::{
    sync_description, PassReport, PassState, Reconciler, ReconcilerConfig, SecretFailure, SYNC_STAMP,
};
pub use upsert::{upsert, UpsertOutcome, UpsertStep};
