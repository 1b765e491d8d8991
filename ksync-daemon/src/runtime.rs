use std::time::Duration;

use tokio::sync::watch;

use ksync_engine::{PassReport, Reconciler};

use crate::error::DaemonError;
use crate::scheduler::{self, SchedulerConfig, SchedulerStats};

/// How long runtime teardown waits for abandoned collaborator calls before
/// the process exits anyway.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Build a runtime, run the loop until SIGINT/SIGTERM, and tear down.
pub fn start_blocking(
    reconciler: Reconciler,
    config: SchedulerConfig,
) -> Result<SchedulerStats, DaemonError> {
    let runtime = build_runtime()?;
    let result = runtime.block_on(run(reconciler, config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Build a runtime and run exactly one pass.
pub fn run_once_blocking(
    reconciler: Reconciler,
    timeout: Duration,
) -> Result<PassReport, DaemonError> {
    let runtime = build_runtime()?;
    let result = runtime.block_on(run_once(reconciler, timeout));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Run the reconciliation loop until a shutdown signal arrives.
pub async fn run(
    reconciler: Reconciler,
    config: SchedulerConfig,
) -> Result<SchedulerStats, DaemonError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_handle = tokio::spawn(signal_task(shutdown_tx));

    let stats = scheduler::run(&reconciler, config, shutdown_rx).await;

    handle_join("signal_handler", signal_handle.await)?;
    Ok(stats)
}

/// Run one pass; a signal during the pass cancels it.
pub async fn run_once(reconciler: Reconciler, timeout: Duration) -> Result<PassReport, DaemonError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_handle = tokio::spawn(signal_task(shutdown_tx));

    let outcome = scheduler::run_pass(&reconciler, timeout, shutdown_rx).await;
    signal_handle.abort();

    Ok(outcome?)
}

/// Flip the shutdown flag on the first SIGINT or SIGTERM.
///
/// If installing the handlers fails the flag is flipped too, so the loop
/// does not keep running without a way to stop it.
async fn signal_task(shutdown: watch::Sender<bool>) -> Result<(), DaemonError> {
    let result = wait_for_signal().await;
    match &result {
        Ok(name) => tracing::info!(signal = *name, "received shutdown signal"),
        Err(err) => tracing::error!(error = %err, "signal handler failed, shutting down"),
    }
    let _ = shutdown.send(true);
    result.map(|_| ()).map_err(DaemonError::Signal)
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        ctrl_c = tokio::signal::ctrl_c() => ctrl_c.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

fn build_runtime() -> Result<tokio::runtime::Runtime, DaemonError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(DaemonError::Runtime)
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            message: err.to_string(),
        }),
    }
}
