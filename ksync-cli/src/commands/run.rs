//! Wire source, Komodo client and engine together, then run the loop or a
//! single pass.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use ksync_core::{Scope, SecretsSource};
use ksync_daemon::{run_once_blocking, start_blocking, SchedulerConfig};
use ksync_engine::{CommitPolicy, FingerprintCache, PassReport, Reconciler, ReconcilerConfig};
use ksync_komodo::{KomodoClient, KomodoConfig};

#[derive(Args, Debug)]
pub struct KomodoArgs {
    /// Base URL of the Komodo core API.
    #[arg(long = "komodo-url", env = "KOMODO_URL")]
    pub url: String,

    #[arg(long = "komodo-api-key", env = "KOMODO_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(
        long = "komodo-api-secret",
        env = "KOMODO_API_SECRET",
        hide_env_values = true
    )]
    pub api_secret: String,

    /// Per-request HTTP timeout.
    #[arg(
        id = "komodo_timeout",
        long = "komodo-timeout",
        env = "KOMODO_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub timeout: Duration,
}

#[derive(Args, Debug)]
pub struct ReconcilerArgs {
    /// Time between reconciliation passes.
    #[arg(
        long = "reconciler-interval",
        env = "RECONCILER_INTERVAL",
        default_value = "5m",
        value_parser = humantime::parse_duration
    )]
    pub interval: Duration,

    /// Deadline for a single pass.
    #[arg(
        id = "reconciler_timeout",
        long = "reconciler-timeout",
        env = "RECONCILER_TIMEOUT",
        default_value = "1m",
        value_parser = humantime::parse_duration
    )]
    pub timeout: Duration,

    /// When a secret is remembered as synced: `optimistic` (before the write)
    /// or `confirmed` (after the write succeeded).
    #[arg(
        long = "reconciler-commit-policy",
        env = "RECONCILER_COMMIT_POLICY",
        default_value_t = CommitPolicy::Optimistic
    )]
    pub commit_policy: CommitPolicy,

    /// Run a single pass and exit.
    #[arg(long)]
    pub once: bool,
}

impl ReconcilerArgs {
    fn scheduler_config(&self) -> Result<SchedulerConfig> {
        if self.interval.is_zero() {
            bail!("--reconciler-interval must be greater than zero");
        }
        if self.timeout.is_zero() {
            bail!("--reconciler-timeout must be greater than zero");
        }
        Ok(SchedulerConfig {
            interval: self.interval,
            timeout: self.timeout,
        })
    }
}

pub fn run(
    komodo: KomodoArgs,
    reconciler: ReconcilerArgs,
    source: Arc<dyn SecretsSource>,
    scope: Scope,
) -> Result<()> {
    let schedule = reconciler.scheduler_config()?;
    let writer = KomodoClient::new(KomodoConfig {
        url: komodo.url,
        api_key: komodo.api_key,
        api_secret: komodo.api_secret,
        timeout: komodo.timeout,
    })
    .context("invalid komodo configuration")?;

    tracing::info!(
        source = source.name(),
        scope = %scope,
        endpoint = writer.endpoint(),
        "configured"
    );

    let engine = Reconciler::new(
        ReconcilerConfig {
            scope,
            commit_policy: reconciler.commit_policy,
        },
        source,
        Arc::new(writer),
        Arc::new(FingerprintCache::new()),
    );

    if reconciler.once {
        let report =
            run_once_blocking(engine, schedule.timeout).context("reconciliation pass failed")?;
        print_report(&report);
        if !report.is_clean() {
            bail!("{} secret(s) failed to sync", report.failed());
        }
        return Ok(());
    }

    let stats = start_blocking(engine, schedule).context("daemon exited with error")?;
    tracing::info!(
        passes = stats.passes,
        failed_passes = stats.failed_passes,
        secrets_synced = stats.secrets_synced,
        secret_failures = stats.secret_failures,
        "shut down"
    );
    Ok(())
}

fn print_report(report: &PassReport) {
    for line in report_lines(report) {
        println!("{line}");
    }
}

fn report_lines(report: &PassReport) -> Vec<String> {
    let mut lines = vec![format!(
        "scanned {}, changed {}: {} created, {} updated, {} failed",
        report.scanned,
        report.modified,
        report.created,
        report.updated,
        report.failed()
    )];
    for failure in &report.failures {
        lines.push(format!("  failed: {}: {}", failure.key, failure.error));
    }
    lines
}
