use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter bindings of a task invocation.
///
/// A `BTreeMap` so that bindings always iterate in name order: two sets of
/// identical bindings render to the same storage key regardless of the
/// order they were declared in.
pub type Params = BTreeMap<String, Value>;

/// Identity of a task invocation: (kind, parameter bindings).
///
/// The same kind invoked with different bindings is a different task with
/// its own independent cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskId {
    pub kind: String,
    pub params: Params,
}

impl TaskId {
    pub fn new(kind: impl Into<String>, params: Params) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// Identity of a task without parameters.
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Params::new())
    }

    /// Stable storage key, e.g. `train_model?model="svd"`.
    ///
    /// Values are rendered as compact JSON, quotes included, so bindings
    /// that differ only in type (`"1"` vs `1`) stay distinct identities.
    pub fn key(&self) -> String {
        if self.params.is_empty() {
            return self.kind.clone();
        }
        let bindings: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!("{}?{}", self.kind, bindings.join("&"))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
