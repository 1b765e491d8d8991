//! Fixed-interval scheduler: one pass at startup, then one per tick.
//!
//! Passes never overlap. The next tick is only awaited after the current
//! pass returned, and ticks missed while a pass ran are delayed rather than
//! replayed in a burst.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use ksync_engine::deadline::shutdown_requested;
use ksync_engine::{Deadline, PassError, PassReport, Reconciler};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between pass starts.
    pub interval: Duration,
    /// Deadline for a single pass.
    pub timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Counters accumulated over the lifetime of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub passes: u64,
    pub failed_passes: u64,
    pub secrets_synced: u64,
    pub secret_failures: u64,
}

impl SchedulerStats {
    fn record(&mut self, outcome: &Result<PassReport, PassError>) {
        self.passes += 1;
        match outcome {
            Ok(report) => {
                self.secrets_synced += report.synced() as u64;
                self.secret_failures += report.failed() as u64;
            }
            Err(_) => self.failed_passes += 1,
        }
    }
}

/// Run passes until `shutdown` turns `true`.
///
/// Pass failures are logged and never stop the loop.
pub async fn run(
    reconciler: &Reconciler,
    config: SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> SchedulerStats {
    tracing::info!(
        interval = ?config.interval,
        timeout = ?config.timeout,
        policy = %reconciler.config().commit_policy,
        "starting reconciliation loop",
    );

    let mut stats = SchedulerStats::default();

    let outcome = run_pass(reconciler, config.timeout, shutdown.clone()).await;
    log_outcome("initial reconciliation", &outcome);
    stats.record(&outcome);

    // tokio intervals panic on a zero period.
    let period = config.interval.max(MIN_INTERVAL);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            _ = ticker.tick() => {
                let outcome = run_pass(reconciler, config.timeout, shutdown.clone()).await;
                log_outcome("reconciliation", &outcome);
                stats.record(&outcome);
            }
        }
    }

    tracing::info!(
        passes = stats.passes,
        failed_passes = stats.failed_passes,
        "reconciliation stopped"
    );
    stats
}

/// One pass under a fresh deadline.
pub async fn run_pass(
    reconciler: &Reconciler,
    timeout: Duration,
    shutdown: watch::Receiver<bool>,
) -> Result<PassReport, PassError> {
    let deadline = Deadline::after(timeout, shutdown);
    reconciler.reconcile(&deadline).await
}

fn log_outcome(label: &str, outcome: &Result<PassReport, PassError>) {
    match outcome {
        Ok(report) => tracing::debug!(
            scanned = report.scanned,
            modified = report.modified,
            synced = report.synced(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis(),
            "{label} finished",
        ),
        Err(err) if err.is_cancelled() => {
            tracing::warn!(error = %err, "{label} interrupted by shutdown")
        }
        Err(err) => tracing::error!(error = %err, "{label} failed"),
    }
}
