//! Client for the Komodo `/write` API, exposed as a [`TargetWriter`].
//!
//! [`TargetWriter`]: ksync_core::TargetWriter

mod client;
mod error;
mod request;

pub use client::{KomodoClient, KomodoConfig, DEFAULT_TIMEOUT};
pub use error::KomodoConfigError;
pub use request::WriteRequest;
