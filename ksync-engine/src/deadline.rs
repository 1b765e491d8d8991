//! Pass deadline and process cancellation, as one mechanism.
//!
//! Collaborator calls are blocking and cannot be interrupted. Each one runs
//! on the blocking pool and is raced against the deadline and the shutdown
//! signal. When the call loses the race the engine stops waiting for it, but
//! the call itself keeps running on its thread until it returns; its result
//! is then dropped.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::PassError;
use crate::reconciler::PassState;

/// Point in time by which a pass must finish, plus the shutdown signal.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Deadline {
    /// A deadline `timeout` from now that also trips once `shutdown` turns
    /// `true`.
    pub fn after(timeout: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
            shutdown,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Fail fast if the pass is already out of time or cancelled.
    pub fn check(&self, state: PassState) -> Result<(), PassError> {
        if self.is_cancelled() {
            return Err(PassError::Cancelled { state });
        }
        if Instant::now() >= self.at {
            return Err(PassError::DeadlineExceeded {
                state,
                timeout: self.timeout,
            });
        }
        Ok(())
    }

    /// Run `op` on the blocking pool, giving up when the deadline elapses or
    /// shutdown is requested, whichever comes first.
    pub async fn run_blocking<T, F>(&self, state: PassState, op: F) -> Result<T, PassError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.check(state)?;

        let mut shutdown = self.shutdown.clone();
        let handle = tokio::task::spawn_blocking(op);

        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => Err(PassError::Cancelled { state }),
            _ = tokio::time::sleep_until(self.at) => Err(PassError::DeadlineExceeded {
                state,
                timeout: self.timeout,
            }),
            joined = handle => joined.map_err(|err| PassError::Task {
                state,
                message: err.to_string(),
            }),
        }
    }
}

/// Resolves once the flag is `true`. A dropped sender means nobody can ask
/// for shutdown any more, so that never resolves.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
