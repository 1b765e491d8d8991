//! Error types for ksync-engine.

use std::time::Duration;

use thiserror::Error;

use ksync_core::{SecretKey, SourceError, WriteError};

use crate::reconciler::PassState;
use crate::upsert::UpsertStep;

/// Errors that end a reconciliation pass early.
///
/// None of these are fatal to the process; the scheduler logs them and
/// waits for the next tick.
#[derive(Debug, Error)]
pub enum PassError {
    /// The secrets source failed; nothing was diffed or written.
    #[error("fetching secrets from {source_name} failed: {source}")]
    Fetch {
        source_name: String,
        #[source]
        source: SourceError,
    },

    /// The pass ran out of time. The in-flight call was abandoned.
    #[error("pass deadline of {timeout:?} exceeded while {state}")]
    DeadlineExceeded { state: PassState, timeout: Duration },

    /// Shutdown was requested while the pass was running.
    #[error("pass cancelled while {state}")]
    Cancelled { state: PassState },

    /// A spawned collaborator call panicked.
    #[error("{state} task failed: {message}")]
    Task { state: PassState, message: String },
}

impl PassError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PassError::Cancelled { .. })
    }
}

/// Failure to bring one variable to its desired state.
///
/// `applied` lists the update steps that already succeeded before `step`
/// failed; they are not rolled back.
#[derive(Debug, Clone, Error)]
#[error("{step} failed for '{name}': {source}")]
pub struct UpsertError {
    pub name: SecretKey,
    pub step: UpsertStep,
    pub applied: Vec<UpsertStep>,
    #[source]
    pub source: WriteError,
}

impl UpsertError {
    /// `true` when some update steps landed before the failure.
    pub fn is_partial(&self) -> bool {
        !self.applied.is_empty()
    }
}
