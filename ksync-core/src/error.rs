//! Error types for the collaborator interfaces.

use thiserror::Error;

/// Failure to read secrets from a secrets manager. Aborts the current pass.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials were rejected by the secrets manager.
    #[error("secrets source authentication failed: {0}")]
    Auth(String),

    /// The secrets manager could not be reached or the client failed to run.
    #[error("secrets source unavailable: {0}")]
    Unavailable(String),

    /// The secrets manager answered with something we could not decode.
    #[error("failed to decode secrets: {0}")]
    Decode(String),

    /// I/O error, annotated with what was being accessed.
    #[error("I/O error at {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn io(what: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            what: what.into(),
            source,
        }
    }
}

/// Failure of a single write against the target platform.
///
/// [`WriteError::Conflict`] is the only class that callers act on: it means
/// a create collided with an existing variable of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The variable already exists (duplicate key).
    #[error("variable '{name}' already exists: {message}")]
    Conflict { name: String, message: String },

    /// The target rejected our credentials.
    #[error("target authentication failed (status {status}): {body}")]
    Auth { status: u16, body: String },

    /// The target refused the request for any other reason.
    #[error("target rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl WriteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, WriteError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_is_conflict() {
        let conflict = WriteError::Conflict {
            name: "K".into(),
            message: "duplicate key".into(),
        };
        assert!(conflict.is_conflict());
        assert!(!WriteError::Transport("reset".into()).is_conflict());
        assert!(!WriteError::Auth {
            status: 401,
            body: String::new()
        }
        .is_conflict());
    }

    #[test]
    fn messages_carry_context() {
        let err = WriteError::Rejected {
            status: 422,
            body: "bad name".into(),
        };
        assert_eq!(
            err.to_string(),
            "target rejected request (status 422): bad name"
        );

        let err = SourceError::io(
            "/tmp/secrets.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/tmp/secrets.json"));
    }
}
