//! In-memory collaborators for reconciliation tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ksync_core::{
    Scope, Secret, SecretKey, SecretsSource, SourceError, TargetWriter, VariableSpec, WriteError,
};
use ksync_engine::{CommitPolicy, FingerprintCache, Reconciler, ReconcilerConfig};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Source that returns scripted fetch results, one per pass. The last
/// script entry repeats once the queue is drained.
#[derive(Default)]
pub struct FakeSource {
    script: Mutex<VecDeque<Result<Vec<Secret>, String>>>,
    last: Mutex<Option<Result<Vec<Secret>, String>>>,
    delay: Mutex<Option<Duration>>,
    pub fetches: Mutex<Vec<Scope>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn then_return(&self, secrets: Vec<Secret>) -> &Self {
        self.script.lock().unwrap().push_back(Ok(secrets));
        self
    }

    pub fn then_fail(&self, message: &str) -> &Self {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn with_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

impl SecretsSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch_all(&self, scope: &Scope) -> Result<Vec<Secret>, SourceError> {
        self.fetches.lock().unwrap().push(scope.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(result) => {
                *self.last.lock().unwrap() = Some(result.clone());
                result
            }
            None => self.last.lock().unwrap().clone().unwrap_or(Ok(Vec::new())),
        };
        result.map_err(SourceError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Delete,
    UpdateValue,
    UpdateDescription,
    UpdateIsSecret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVariable {
    pub value: String,
    pub description: String,
    pub is_secret: bool,
}

/// Writer backed by a map that behaves like the target API: create fails
/// with a duplicate-key conflict for existing names, updates fail for
/// missing ones. Individual (name, op) pairs can be scripted to fail.
#[derive(Default)]
pub struct FakeWriter {
    pub variables: Mutex<HashMap<String, StoredVariable>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<(String, Op)>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pretend `name` already exists on the target with a stale value.
    pub fn preexisting(&self, name: &str, value: &str) {
        self.variables.lock().unwrap().insert(
            name.to_string(),
            StoredVariable {
                value: value.to_string(),
                description: "created by hand".to_string(),
                is_secret: false,
            },
        );
    }

    pub fn fail(&self, name: &str, op: Op) {
        self.failures.lock().unwrap().insert((name.to_string(), op));
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn with_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops_for(&self, name: &str) -> Vec<Op> {
        self.calls()
            .into_iter()
            .filter(|c| c.name == name)
            .map(|c| c.op)
            .collect()
    }

    pub fn value_of(&self, name: &str) -> Option<String> {
        self.variables
            .lock()
            .unwrap()
            .get(name)
            .map(|v| v.value.clone())
    }

    pub fn variable(&self, name: &str) -> Option<StoredVariable> {
        self.variables.lock().unwrap().get(name).cloned()
    }

    fn record(&self, op: Op, name: &SecretKey) -> Result<(), WriteError> {
        self.calls.lock().unwrap().push(Call {
            op,
            name: name.to_string(),
        });
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self
            .failures
            .lock()
            .unwrap()
            .contains(&(name.to_string(), op))
        {
            return Err(WriteError::Rejected {
                status: 500,
                body: format!("scripted {op:?} failure"),
            });
        }
        Ok(())
    }

    fn update(
        &self,
        name: &SecretKey,
        apply: impl FnOnce(&mut StoredVariable),
    ) -> Result<(), WriteError> {
        let mut variables = self.variables.lock().unwrap();
        match variables.get_mut(name.as_str()) {
            Some(variable) => {
                apply(variable);
                Ok(())
            }
            None => Err(WriteError::Rejected {
                status: 404,
                body: format!("no variable named {name}"),
            }),
        }
    }
}

impl TargetWriter for FakeWriter {
    fn create_variable(&self, spec: &VariableSpec) -> Result<(), WriteError> {
        self.record(Op::Create, &spec.name)?;
        let mut variables = self.variables.lock().unwrap();
        if variables.contains_key(spec.name.as_str()) {
            return Err(WriteError::Conflict {
                name: spec.name.to_string(),
                message: "E11000 duplicate key error collection: komodo.Variable".into(),
            });
        }
        variables.insert(
            spec.name.to_string(),
            StoredVariable {
                value: spec.value.clone(),
                description: spec.description.clone(),
                is_secret: spec.is_secret,
            },
        );
        Ok(())
    }

    fn delete_variable(&self, name: &SecretKey) -> Result<(), WriteError> {
        self.record(Op::Delete, name)?;
        self.variables.lock().unwrap().remove(name.as_str());
        Ok(())
    }

    fn update_value(&self, name: &SecretKey, value: &str) -> Result<(), WriteError> {
        self.record(Op::UpdateValue, name)?;
        self.update(name, |v| v.value = value.to_string())
    }

    fn update_description(&self, name: &SecretKey, description: &str) -> Result<(), WriteError> {
        self.record(Op::UpdateDescription, name)?;
        self.update(name, |v| v.description = description.to_string())
    }

    fn update_is_secret(&self, name: &SecretKey, is_secret: bool) -> Result<(), WriteError> {
        self.record(Op::UpdateIsSecret, name)?;
        self.update(name, |v| v.is_secret = is_secret)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn reconciler(
    source: &Arc<FakeSource>,
    writer: &Arc<FakeWriter>,
    policy: CommitPolicy,
) -> Reconciler {
    Reconciler::new(
        ReconcilerConfig {
            scope: Scope::from("proj-1"),
            commit_policy: policy,
        },
        source.clone(),
        writer.clone(),
        Arc::new(FingerprintCache::new()),
    )
}

pub fn secrets(pairs: &[(&str, &str)]) -> Vec<Secret> {
    pairs.iter().map(|(k, v)| Secret::new(*k, *v)).collect()
}
