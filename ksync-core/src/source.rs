//! Read side: where secrets come from.

use crate::error::SourceError;
use crate::types::{Scope, Secret};

/// A secrets manager that can list every secret in a scope.
///
/// Implementations are blocking. The engine runs each call on the blocking
/// pool and abandons it when the pass deadline elapses, so an implementation
/// does not need its own timeout handling; it should however not hold locks
/// that a later call would need, since an abandoned call may still be
/// running.
pub trait SecretsSource: Send + Sync {
    /// Short vendor name for logs, e.g. `"bitwarden"`.
    fn name(&self) -> &str;

    /// Fetch every secret visible in `scope`, in the order the vendor
    /// returns them.
    fn fetch_all(&self, scope: &Scope) -> Result<Vec<Secret>, SourceError>;
}

impl<T: SecretsSource + ?Sized> SecretsSource for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_all(&self, scope: &Scope) -> Result<Vec<Secret>, SourceError> {
        (**self).fetch_all(scope)
    }
}
