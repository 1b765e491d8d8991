//! Bitwarden Secrets Manager, read through the `bws` command-line client.
//!
//! Every fetch runs
//! `bws secret list [<project-id>] --output json --server-url <base>` with
//! the access token passed as `BWS_ACCESS_TOKEN` in the child environment,
//! never on the command line. A run that outlives the configured timeout is
//! killed.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use url::Url;

use ksync_core::{Scope, Secret, SecretsSource, SourceError};

use crate::error::SourceConfigError;

pub const DEFAULT_API_URL: &str = "vault.bitwarden.com/api";
pub const DEFAULT_IDENTITY_URL: &str = "vault.bitwarden.com/identity";
pub const DEFAULT_BWS_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Settings for [`BwsCliSource`]. URLs may omit the scheme.
#[derive(Clone)]
pub struct BitwardenConfig {
    pub api_url: String,
    pub identity_url: String,
    pub access_token: String,
    pub organization_id: String,
    /// Path or name of the `bws` executable.
    pub bws_path: PathBuf,
    /// Upper bound for one `bws` run.
    pub timeout: Duration,
}

impl Default for BitwardenConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            access_token: String::new(),
            organization_id: String::new(),
            bws_path: PathBuf::from("bws"),
            timeout: DEFAULT_BWS_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for BitwardenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitwardenConfig")
            .field("api_url", &self.api_url)
            .field("identity_url", &self.identity_url)
            .field("access_token", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .field("bws_path", &self.bws_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Fields of one `bws secret list` entry that we use. The rest (`id`,
/// `projectId`, dates) is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BwsSecret {
    organization_id: String,
    key: String,
    value: String,
    #[serde(default)]
    note: String,
}

pub struct BwsCliSource {
    program: PathBuf,
    server_url: String,
    access_token: String,
    organization_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for BwsCliSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BwsCliSource")
            .field("program", &self.program)
            .field("server_url", &self.server_url)
            .field("organization_id", &self.organization_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BwsCliSource {
    pub fn new(config: BitwardenConfig) -> Result<Self, SourceConfigError> {
        if config.access_token.trim().is_empty() {
            return Err(SourceConfigError::Missing("bitwarden access token"));
        }
        if config.organization_id.trim().is_empty() {
            return Err(SourceConfigError::Missing("bitwarden organization id"));
        }
        if config.bws_path.as_os_str().is_empty() {
            return Err(SourceConfigError::Missing("bws path"));
        }
        if config.timeout.is_zero() {
            return Err(SourceConfigError::ZeroTimeout("bws timeout"));
        }

        let api_url = normalize_url("api url", &config.api_url)?;
        let identity_url = normalize_url("identity url", &config.identity_url)?;
        let server_url = server_base(&api_url, &identity_url);

        Ok(Self {
            program: config.bws_path,
            server_url,
            access_token: config.access_token,
            organization_id: config.organization_id.trim().to_string(),
            timeout: config.timeout,
        })
    }

    /// Server URL handed to `bws --server-url`.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Arguments for one `secret list` invocation.
    pub fn list_args(&self, scope: &Scope) -> Vec<String> {
        let mut args = vec!["secret".to_string(), "list".to_string()];
        if let Some(project) = scope.id() {
            args.push(project.to_string());
        }
        args.extend(
            ["--output", "json", "--server-url", self.server_url.as_str()]
                .into_iter()
                .map(String::from),
        );
        args
    }

    fn decode(&self, stdout: &[u8]) -> Result<Vec<Secret>, SourceError> {
        let listed: Vec<BwsSecret> = serde_json::from_slice(stdout)
            .map_err(|err| SourceError::Decode(format!("bws output: {err}")))?;

        let total = listed.len();
        let secrets: Vec<Secret> = listed
            .into_iter()
            .filter(|s| s.organization_id == self.organization_id)
            .map(|s| Secret::new(s.key, s.value).with_note(s.note))
            .collect();

        if secrets.len() != total {
            tracing::debug!(
                skipped = total - secrets.len(),
                organization = %self.organization_id,
                "ignoring secrets from other organizations"
            );
        }
        Ok(secrets)
    }

    /// Wait for `child`, killing it once the timeout has passed.
    fn wait(&self, child: &mut Child) -> Result<ExitStatus, SourceError> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if started.elapsed() >= self.timeout => {
                    tracing::warn!(
                        pid = child.id(),
                        timeout = ?self.timeout,
                        "bws did not finish in time; killing it"
                    );
                    reap(child);
                    return Err(SourceError::Unavailable(format!(
                        "bws did not finish within {:?}",
                        self.timeout
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    reap(child);
                    return Err(SourceError::io(self.program.display().to_string(), err));
                }
            }
        }
    }
}

impl SecretsSource for BwsCliSource {
    fn name(&self) -> &str {
        "bitwarden"
    }

    fn fetch_all(&self, scope: &Scope) -> Result<Vec<Secret>, SourceError> {
        tracing::debug!(
            scope = %scope,
            program = %self.program.display(),
            "listing bitwarden secrets"
        );

        let mut child = Command::new(&self.program)
            .args(self.list_args(scope))
            .env("BWS_ACCESS_TOKEN", &self.access_token)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => SourceError::Unavailable(format!(
                    "bws executable not found at '{}'",
                    self.program.display()
                )),
                _ => SourceError::io(self.program.display().to_string(), err),
            })?;

        // Drain both pipes while waiting so a chatty child cannot block on a
        // full pipe buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            return Err(classify_failure(status.code(), stderr));
        }

        self.decode(&stdout)
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Turn a failed `bws` run into a source error.
fn classify_failure(code: Option<i32>, stderr: String) -> SourceError {
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("access token") || lowered.contains("unauthorized") {
        return SourceError::Auth(stderr);
    }
    let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    SourceError::Unavailable(format!("bws exited with {code}: {stderr}"))
}

/// Parse a configured URL, defaulting the scheme to https when it is missing.
fn normalize_url(name: &'static str, raw: &str) -> Result<Url, SourceConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| SourceConfigError::InvalidUrl {
        name,
        url: trimmed.to_string(),
        reason,
    };
    if trimmed.is_empty() {
        return Err(invalid("empty".to_string()));
    }

    let url = match Url::parse(trimmed) {
        Ok(url) if !url.cannot_be_a_base() => url,
        // No scheme at all, or `host:port/...` read as a scheme.
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{trimmed}")).map_err(|err| invalid(err.to_string()))?
        }
        Err(err) => return Err(invalid(err.to_string())),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// `bws` takes one server URL and derives `/api` and `/identity` from it.
fn server_base(api_url: &Url, identity_url: &Url) -> String {
    let api = api_url.as_str().trim_end_matches('/');
    let base = api.strip_suffix("/api").unwrap_or(api);
    let expected_identity = format!("{base}/identity");
    let identity = identity_url.as_str().trim_end_matches('/');
    if identity != expected_identity {
        tracing::warn!(
            identity_url = identity,
            derived = %expected_identity,
            "bws derives the identity url from the server url; configured identity url is ignored"
        );
    }
    base.to_string()
}
