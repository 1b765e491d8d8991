use thiserror::Error;

/// Rejected client configuration. Raised once at startup, never per request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KomodoConfigError {
    #[error("komodo url is empty")]
    EmptyUrl,

    #[error("invalid komodo url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("missing komodo credential: {0}")]
    MissingCredential(&'static str),
}
