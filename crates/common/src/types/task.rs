use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::HexId;

/// The `{class, id, arguments}` triple carried through both the in-process
/// channel and the cross-worker task queue (§3, §4.6, §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub class: String,
    pub id: HexId,
    /// Ordered tuple of positional arguments, passed to the handler's
    /// `handle(id, ...arguments)` (§4.6).
    pub arguments: Vec<Value>,
}

impl TaskEnvelope {
    pub fn new(class: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            class: class.into(),
            id: HexId::generate(),
            arguments,
        }
    }
}

/// Published outcome of a task execution — success carries the handler's
/// result value, failure carries the error message (§4.6 `handle`/`finish`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub class: String,
    pub id: HexId,
    pub arguments: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn success(envelope: &TaskEnvelope, result: Value) -> Self {
        Self {
            class: envelope.class.clone(),
            id: envelope.id,
            arguments: envelope.arguments.clone(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(envelope: &TaskEnvelope, error: impl Into<String>) -> Self {
        Self {
            class: envelope.class.clone(),
            id: envelope.id,
            arguments: envelope.arguments.clone(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
