//! ksync core library: domain types, collaborator traits, errors.
//!
//! - [`types`]: secrets, variable specs, scope
//! - [`error`]: [`SourceError`] and [`WriteError`]
//! - [`source`]: [`SecretsSource`], the read side
//! - [`target`]: [`TargetWriter`], the write side

pub mod error;
pub mod source;
pub mod target;
pub mod types;

pub use error::{SourceError, WriteError};
pub use source::SecretsSource;
pub use target::TargetWriter;
pub use types::{Scope, Secret, SecretKey, VariableSpec};
