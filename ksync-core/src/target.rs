//! Write side: the platform that stores variables.

use crate::error::WriteError;
use crate::types::{SecretKey, VariableSpec};

/// The five write primitives exposed by the target platform.
///
/// The platform API is create-xor-mutate: `create_variable` fails with
/// [`WriteError::Conflict`] when the name is taken, and the `update_*` calls
/// only work on existing variables. Upsert semantics are built on top of
/// these by the engine.
pub trait TargetWriter: Send + Sync {
    fn create_variable(&self, spec: &VariableSpec) -> Result<(), WriteError>;

    fn delete_variable(&self, name: &SecretKey) -> Result<(), WriteError>;

    fn update_value(&self, name: &SecretKey, value: &str) -> Result<(), WriteError>;

    fn update_description(&self, name: &SecretKey, description: &str) -> Result<(), WriteError>;

    fn update_is_secret(&self, name: &SecretKey, is_secret: bool) -> Result<(), WriteError>;
}

impl<T: TargetWriter + ?Sized> TargetWriter for std::sync::Arc<T> {
    fn create_variable(&self, spec: &VariableSpec) -> Result<(), WriteError> {
        (**self).create_variable(spec)
    }

    fn delete_variable(&self, name: &SecretKey) -> Result<(), WriteError> {
        (**self).delete_variable(name)
    }

    fn update_value(&self, name: &SecretKey, value: &str) -> Result<(), WriteError> {
        (**self).update_value(name, value)
    }

    fn update_description(&self, name: &SecretKey, description: &str) -> Result<(), WriteError> {
        (**self).update_description(name, description)
    }

    fn update_is_secret(&self, name: &SecretKey, is_secret: bool) -> Result<(), WriteError> {
        (**self).update_is_secret(name, is_secret)
    }
}
