//! Subcommands selecting where secrets come from.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use ksync_core::{Scope, SecretsSource};
use ksync_sources::{
    BitwardenConfig, BwsCliSource, JsonFileSource, DEFAULT_API_URL, DEFAULT_IDENTITY_URL,
};

#[derive(Subcommand, Debug)]
pub enum SourceCommand {
    /// Read secrets from Bitwarden Secrets Manager via the `bws` CLI.
    Bitwarden(BitwardenArgs),

    /// Read secrets from a local JSON file.
    File(FileArgs),
}

#[derive(Args, Debug)]
pub struct BitwardenArgs {
    /// Bitwarden API URL; https:// is assumed when no scheme is given.
    #[arg(long, env = "BW_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bitwarden identity URL.
    #[arg(long, env = "BW_IDENTITY_URL", default_value = DEFAULT_IDENTITY_URL)]
    pub identity_url: String,

    /// Machine account access token.
    #[arg(long, env = "BW_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    #[arg(long, env = "BW_ORGANIZATION_ID")]
    pub organization_id: String,

    /// Only sync secrets of this project.
    #[arg(long, env = "BW_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Path to the `bws` executable.
    #[arg(long, env = "BWS_PATH", default_value = "bws")]
    pub bws_path: PathBuf,

    /// Kill a `bws` run that takes longer than this.
    #[arg(
        long,
        env = "BWS_TIMEOUT",
        default_value = "1m",
        value_parser = humantime::parse_duration
    )]
    pub bws_timeout: Duration,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// JSON array of {"key", "value", "note"} objects.
    #[arg(long, env = "SECRETS_FILE")]
    pub path: PathBuf,
}

impl SourceCommand {
    /// Build the configured source and the scope it is queried with.
    pub fn build(self) -> Result<(Arc<dyn SecretsSource>, Scope)> {
        match self {
            SourceCommand::Bitwarden(args) => {
                let scope = Scope::from(args.project_id);
                let source = BwsCliSource::new(BitwardenConfig {
                    api_url: args.api_url,
                    identity_url: args.identity_url,
                    access_token: args.access_token,
                    organization_id: args.organization_id,
                    bws_path: args.bws_path,
                    timeout: args.bws_timeout,
                })
                .context("invalid bitwarden configuration")?;
                Ok((Arc::new(source), scope))
            }
            SourceCommand::File(args) => {
                let source = JsonFileSource::new(args.path)
                    .context("invalid secrets file configuration")?;
                Ok((Arc::new(source), Scope::all()))
            }
        }
    }
}
