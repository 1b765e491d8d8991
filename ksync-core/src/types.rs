//! Domain types shared by the engine and its collaborators.
//!
//! Secret values never appear in `Debug` output; anything that may end up in
//! a log line formats as `<redacted>` instead.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of a secret in the secrets manager, and of the variable it becomes
/// on the target platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretKey(pub String);

impl SecretKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SecretKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque identifier selecting which secrets a source returns.
///
/// For Bitwarden this is a project id. The empty scope means "everything the
/// credentials can read".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Scope(pub String);

impl Scope {
    pub fn all() -> Self {
        Self(String::new())
    }

    pub fn is_all(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The scope as an identifier, or `None` for the all-secrets scope.
    pub fn id(&self) -> Option<&str> {
        if self.is_all() {
            None
        } else {
            Some(self.0.trim())
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => f.write_str(id),
            None => f.write_str("*"),
        }
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<Option<String>> for Scope {
    fn from(s: Option<String>) -> Self {
        Self(s.unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One secret as returned by a [`crate::SecretsSource`] fetch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub key: SecretKey,
    pub value: String,
    #[serde(default)]
    pub note: String,
}

impl Secret {
    pub fn new(key: impl Into<SecretKey>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("key", &self.key)
            .field("value", &"<redacted>")
            .field("note", &self.note)
            .finish()
    }
}

/// Desired state of a variable on the target platform.
#[derive(Clone, PartialEq, Eq)]
pub struct VariableSpec {
    pub name: SecretKey,
    pub value: String,
    pub description: String,
    pub is_secret: bool,
}

impl VariableSpec {
    /// Desired state for `secret`, flagged secret and stamped with
    /// `description`.
    pub fn from_secret(secret: &Secret, description: impl Into<String>) -> Self {
        Self {
            name: secret.key.clone(),
            value: secret.value.clone(),
            description: description.into(),
            is_secret: true,
        }
    }
}

impl fmt::Debug for VariableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableSpec")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("description", &self.description)
            .field("is_secret", &self.is_secret)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
