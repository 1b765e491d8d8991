//! Create-or-update on a target whose API has no upsert.
//!
//! ## Protocol
//!
//! 1. `create_variable` with the full desired state.
//! 2. Success → [`UpsertOutcome::Created`].
//! 3. [`WriteError::Conflict`] → update description, then the is_secret
//!    flag, then the value. The first failing step ends the upsert; steps
//!    that already succeeded stay applied.
//! 4. Any other create error → failure, no update attempted.

use std::fmt;

use ksync_core::{TargetWriter, VariableSpec, WriteError};

use crate::error::UpsertError;

/// One write primitive issued during an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStep {
    Create,
    UpdateDescription,
    UpdateIsSecret,
    UpdateValue,
}

impl fmt::Display for UpsertStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertStep::Create => write!(f, "create"),
            UpsertStep::UpdateDescription => write!(f, "update description"),
            UpsertStep::UpdateIsSecret => write!(f, "update is_secret"),
            UpsertStep::UpdateValue => write!(f, "update value"),
        }
    }
}

/// How the variable reached its desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The variable did not exist and was created.
    Created,
    /// The variable existed and all three update steps succeeded.
    Updated,
}

/// Bring the variable named by `spec` to the desired state.
pub fn upsert<W>(writer: &W, spec: &VariableSpec) -> Result<UpsertOutcome, UpsertError>
where
    W: TargetWriter + ?Sized,
{
    match writer.create_variable(spec) {
        Ok(()) => return Ok(UpsertOutcome::Created),
        Err(err) if err.is_conflict() => {
            tracing::warn!(variable = %spec.name, "variable already exists, updating");
        }
        Err(source) => {
            return Err(UpsertError {
                name: spec.name.clone(),
                step: UpsertStep::Create,
                applied: Vec::new(),
                source,
            });
        }
    }

    let updates: [(UpsertStep, &dyn Fn() -> Result<(), WriteError>); 3] = [
        (UpsertStep::UpdateDescription, &|| {
            writer.update_description(&spec.name, &spec.description)
        }),
        (UpsertStep::UpdateIsSecret, &|| {
            writer.update_is_secret(&spec.name, spec.is_secret)
        }),
        (UpsertStep::UpdateValue, &|| {
            writer.update_value(&spec.name, &spec.value)
        }),
    ];

    let mut applied = Vec::with_capacity(updates.len());
    for (step, apply) in updates {
        if let Err(source) = apply() {
            if !applied.is_empty() {
                tracing::warn!(
                    variable = %spec.name,
                    failed_step = %step,
                    applied = ?applied,
                    "variable left partially updated",
                );
            }
            return Err(UpsertError {
                name: spec.name.clone(),
                step,
                applied,
                source,
            });
        }
        applied.push(step);
    }

    Ok(UpsertOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ksync_core::{Secret, SecretKey};

    /// Writer that records call names and fails the scripted ones.
    #[derive(Default)]
    struct ScriptedWriter {
        calls: Mutex<Vec<&'static str>>,
        conflict_on_create: bool,
        fail: Option<&'static str>,
    }

    impl ScriptedWriter {
        fn call(&self, name: &'static str) -> Result<(), WriteError> {
            self.calls.lock().unwrap().push(name);
            if name == "create" && self.conflict_on_create {
                return Err(WriteError::Conflict {
                    name: "K".into(),
                    message: "E11000 duplicate key error".into(),
                });
            }
            if self.fail == Some(name) {
                return Err(WriteError::Rejected {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TargetWriter for ScriptedWriter {
        fn create_variable(&self, _spec: &VariableSpec) -> Result<(), WriteError> {
            self.call("create")
        }
        fn delete_variable(&self, _name: &SecretKey) -> Result<(), WriteError> {
            self.call("delete")
        }
        fn update_value(&self, _name: &SecretKey, _value: &str) -> Result<(), WriteError> {
            self.call("value")
        }
        fn update_description(&self, _name: &SecretKey, _d: &str) -> Result<(), WriteError> {
            self.call("description")
        }
        fn update_is_secret(&self, _name: &SecretKey, _s: bool) -> Result<(), WriteError> {
            self.call("is_secret")
        }
    }

    fn spec() -> VariableSpec {
        VariableSpec::from_secret(&Secret::new("K", "v"), "Synced by test")
    }

    #[test]
    fn create_success_issues_a_single_call() {
        let writer = ScriptedWriter::default();
        assert_eq!(upsert(&writer, &spec()).unwrap(), UpsertOutcome::Created);
        assert_eq!(writer.calls(), ["create"]);
    }

    #[test]
    fn conflict_runs_updates_in_order() {
        let writer = ScriptedWriter {
            conflict_on_create: true,
            ..Default::default()
        };
        assert_eq!(upsert(&writer, &spec()).unwrap(), UpsertOutcome::Updated);
        assert_eq!(
            writer.calls(),
            ["create", "description", "is_secret", "value"]
        );
    }

    #[test]
    fn failing_update_halts_remaining_steps() {
        let writer = ScriptedWriter {
            conflict_on_create: true,
            fail: Some("is_secret"),
            ..Default::default()
        };
        let err = upsert(&writer, &spec()).unwrap_err();
        assert_eq!(err.step, UpsertStep::UpdateIsSecret);
        assert_eq!(err.applied, [UpsertStep::UpdateDescription]);
        assert!(err.is_partial());
        assert_eq!(writer.calls(), ["create", "description", "is_secret"]);
    }

    #[test]
    fn non_conflict_create_error_skips_updates() {
        let writer = ScriptedWriter {
            fail: Some("create"),
            ..Default::default()
        };
        let err = upsert(&writer, &spec()).unwrap_err();
        assert_eq!(err.step, UpsertStep::Create);
        assert!(!err.is_partial());
        assert_eq!(writer.calls(), ["create"]);
        assert_eq!(
            err.to_string(),
            "create failed for 'K': target rejected request (status 500): boom"
        );
    }
}
