//! [`SecretsSource`] implementations.
//!
//! [`SecretsSource`]: ksync_core::SecretsSource

pub mod bitwarden;
mod error;
pub mod file;

pub use bitwarden::{
    BitwardenConfig, BwsCliSource, DEFAULT_API_URL, DEFAULT_BWS_TIMEOUT, DEFAULT_IDENTITY_URL,
};
pub use error::SourceConfigError;
pub use file::JsonFileSource;
