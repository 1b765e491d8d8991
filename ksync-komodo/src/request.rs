//! Bodies of `POST /write` requests.

use serde::Serialize;
use serde_json::Value;

/// One write operation, serialized as `{"type": <op>, "params": {...}}`.
#[derive(Clone, Serialize)]
#[serde(tag = "type", content = "params")]
pub enum WriteRequest<'a> {
    CreateVariable {
        name: &'a str,
        value: &'a str,
        description: &'a str,
        is_secret: bool,
    },
    DeleteVariable {
        name: &'a str,
    },
    UpdateVariableValue {
        name: &'a str,
        value: &'a str,
    },
    UpdateVariableDescription {
        name: &'a str,
        description: &'a str,
    },
    UpdateVariableIsSecret {
        name: &'a str,
        is_secret: bool,
    },
}

impl<'a> WriteRequest<'a> {
    /// Variable the request targets.
    pub fn name(&self) -> &'a str {
        match self {
            WriteRequest::CreateVariable { name, .. }
            | WriteRequest::DeleteVariable { name }
            | WriteRequest::UpdateVariableValue { name, .. }
            | WriteRequest::UpdateVariableDescription { name, .. }
            | WriteRequest::UpdateVariableIsSecret { name, .. } => *name,
        }
    }

    /// Operation name as sent in the `type` field.
    pub fn op(&self) -> &'static str {
        match self {
            WriteRequest::CreateVariable { .. } => "CreateVariable",
            WriteRequest::DeleteVariable { .. } => "DeleteVariable",
            WriteRequest::UpdateVariableValue { .. } => "UpdateVariableValue",
            WriteRequest::UpdateVariableDescription { .. } => "UpdateVariableDescription",
            WriteRequest::UpdateVariableIsSecret { .. } => "UpdateVariableIsSecret",
        }
    }

    /// JSON body with the secret value masked, for logging.
    pub fn redacted(&self) -> Value {
        let mut body = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(value) = body.pointer_mut("/params/value") {
            *value = Value::String("<redacted>".to_string());
        }
        body
    }
}
