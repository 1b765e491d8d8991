use thiserror::Error;

/// Invalid source settings, reported at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceConfigError {
    #[error("{0} must not be empty")]
    Missing(&'static str),

    #[error("invalid {name} '{url}': {reason}")]
    InvalidUrl {
        name: &'static str,
        url: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}
