use thiserror::Error;

use ksync_engine::PassError;

/// Error surface for the runtime, signal handling and logging setup.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to build tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("signal handler failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },

    #[error("reconciliation pass failed: {0}")]
    Pass(#[from] PassError),

    #[error("logging setup failed: {0}")]
    Logging(String),
}
