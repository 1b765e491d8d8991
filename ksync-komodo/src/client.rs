use std::time::Duration;

use url::Url;

use ksync_core::{SecretKey, TargetWriter, VariableSpec, WriteError};

use crate::error::KomodoConfigError;
use crate::request::WriteRequest;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Substring Komodo puts in the error body when a name is already taken.
const DUPLICATE_KEY: &str = "duplicate key";

/// Connection settings for a Komodo core instance.
#[derive(Clone)]
pub struct KomodoConfig {
    /// Base URL, e.g. `https://komodo.example.com`.
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for KomodoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KomodoConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blocking HTTP client for `POST <url>/write`.
pub struct KomodoClient {
    endpoint: Url,
    api_key: String,
    api_secret: String,
    agent: ureq::Agent,
}

impl KomodoClient {
    pub fn new(config: KomodoConfig) -> Result<Self, KomodoConfigError> {
        let endpoint = write_endpoint(&config.url)?;
        if config.api_key.trim().is_empty() {
            return Err(KomodoConfigError::MissingCredential("api key"));
        }
        if config.api_secret.trim().is_empty() {
            return Err(KomodoConfigError::MissingCredential("api secret"));
        }

        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self {
            endpoint,
            api_key: config.api_key,
            api_secret: config.api_secret,
            agent,
        })
    }

    /// Full URL every request is posted to.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn send(&self, request: &WriteRequest<'_>) -> Result<(), WriteError> {
        tracing::debug!(
            op = request.op(),
            variable = request.name(),
            payload = %request.redacted(),
            "komodo write"
        );

        let result = self
            .agent
            .post(self.endpoint.as_str())
            .set("X-Api-Key", &self.api_key)
            .set("X-Api-Secret", &self.api_secret)
            .set("Content-Type", "application/json")
            .send_json(request);

        match result {
            Ok(response) if (200..300).contains(&response.status()) => Ok(()),
            // Unfollowed redirects and other non-2xx replies that ureq does
            // not report as errors.
            Ok(response) => {
                let status = response.status();
                let body = response.into_string().unwrap_or_default();
                Err(classify(request.name(), status, body))
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(classify(request.name(), status, body))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(WriteError::Transport(transport.to_string()))
            }
        }
    }
}

impl TargetWriter for KomodoClient {
    fn create_variable(&self, spec: &VariableSpec) -> Result<(), WriteError> {
        self.send(&WriteRequest::CreateVariable {
            name: spec.name.as_str(),
            value: &spec.value,
            description: &spec.description,
            is_secret: spec.is_secret,
        })
    }

    fn delete_variable(&self, name: &SecretKey) -> Result<(), WriteError> {
        self.send(&WriteRequest::DeleteVariable {
            name: name.as_str(),
        })
    }

    fn update_value(&self, name: &SecretKey, value: &str) -> Result<(), WriteError> {
        self.send(&WriteRequest::UpdateVariableValue {
            name: name.as_str(),
            value,
        })
    }

    fn update_description(&self, name: &SecretKey, description: &str) -> Result<(), WriteError> {
        self.send(&WriteRequest::UpdateVariableDescription {
            name: name.as_str(),
            description,
        })
    }

    fn update_is_secret(&self, name: &SecretKey, is_secret: bool) -> Result<(), WriteError> {
        self.send(&WriteRequest::UpdateVariableIsSecret {
            name: name.as_str(),
            is_secret,
        })
    }
}

/// Map a non-success response onto the write error classes.
fn classify(name: &str, status: u16, body: String) -> WriteError {
    let body = body.trim().to_string();
    if body.contains(DUPLICATE_KEY) {
        return WriteError::Conflict {
            name: name.to_string(),
            message: body,
        };
    }
    match status {
        401 | 403 => WriteError::Auth { status, body },
        _ => WriteError::Rejected { status, body },
    }
}

/// Parse the base URL and resolve `write` against it. Trailing slashes on
/// the base are ignored.
fn write_endpoint(raw: &str) -> Result<Url, KomodoConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(KomodoConfigError::EmptyUrl);
    }
    let invalid = |reason: String| KomodoConfigError::InvalidUrl {
        url: trimmed.to_string(),
        reason,
    };

    let base = Url::parse(&format!("{trimmed}/")).map_err(|err| invalid(err.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
    }
    if base.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    base.join("write").map_err(|err| invalid(err.to_string()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn config(url: &str) -> KomodoConfig {
        KomodoConfig {
            url: url.to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[rstest]
    #[case("https://komodo.example.com", "https://komodo.example.com/write")]
    #[case("https://komodo.example.com///", "https://komodo.example.com/write")]
    #[case("http://10.0.0.5:9120/", "http://10.0.0.5:9120/write")]
    #[case("https://example.com/komodo/", "https://example.com/komodo/write")]
    fn endpoint_ignores_trailing_slashes(#[case] url: &str, #[case] expected: &str) {
        let client = KomodoClient::new(config(url)).unwrap();
        assert_eq!(client.endpoint(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("  / ")]
    fn blank_url_is_rejected(#[case] url: &str) {
        assert_eq!(
            KomodoClient::new(config(url)).err(),
            Some(KomodoConfigError::EmptyUrl)
        );
    }

    #[rstest]
    #[case("komodo.example.com")]
    #[case("https://")]
    #[case("https://example.com:notaport")]
    #[case("http://[::1")]
    #[case("ftp://komodo.example.com")]
    fn malformed_urls_fail_at_construction(#[case] url: &str) {
        match KomodoClient::new(config(url)) {
            Err(KomodoConfigError::InvalidUrl { .. }) => {}
            Err(other) => panic!("{url}: unexpected error {other}"),
            Ok(client) => panic!("{url}: accepted as {}", client.endpoint()),
        }
    }

    #[test]
    fn credentials_are_required() {
        let mut missing = config("https://komodo.example.com");
        missing.api_secret = " ".to_string();
        assert_eq!(
            KomodoClient::new(missing).err(),
            Some(KomodoConfigError::MissingCredential("api secret"))
        );
    }

    #[test]
    fn debug_hides_credentials() {
        let rendered = format!("{:?}", config("https://komodo.example.com"));
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[rstest]
    #[case(409, "E11000 duplicate key error collection: variables", true)]
    #[case(500, "{\"error\":\"duplicate key\"}", true)]
    #[case(500, "internal error", false)]
    #[case(400, "bad request", false)]
    fn duplicate_key_means_conflict(
        #[case] status: u16,
        #[case] body: &str,
        #[case] conflict: bool,
    ) {
        assert_eq!(classify("K", status, body.to_string()).is_conflict(), conflict);
    }

    #[test]
    fn auth_statuses_are_classified() {
        assert_eq!(
            classify("K", 401, "invalid api key\n".to_string()),
            WriteError::Auth {
                status: 401,
                body: "invalid api key".into()
            }
        );
        assert!(matches!(
            classify("K", 403, String::new()),
            WriteError::Auth { status: 403, .. }
        ));
        assert!(matches!(
            classify("K", 404, String::new()),
            WriteError::Rejected { status: 404, .. }
        ));
    }
}
