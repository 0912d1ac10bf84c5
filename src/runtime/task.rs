use std::collections::HashMap;
use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;
use crate::runtime::identity::Params;

/// A named unit of work.
///
/// `run` must be a pure function of its parameter bindings and its
/// dependencies' loaded outputs; it must not read global mutable state and
/// it must not persist anything itself. The runner saves the returned
/// output (and metadata) after `run` returns, so a task can be reasoned
/// about as a plain transformation.
#[async_trait]
pub trait Task: Send + Sync + Debug {
    fn kind(&self) -> &str;

    /// Reject bindings outside the declared domain before `run` is ever
    /// attempted. A rejected binding leaves no store entry.
    fn validate(&self, params: &Params) -> Result<(), PipelineError> {
        let _ = params;
        Ok(())
    }

    async fn run(&self, params: &Params, inputs: &TaskInputs) -> Result<TaskOutput>;
}

/// The value a task produced, plus an optional metadata side channel
/// (e.g. an evaluation score) that can later be loaded without touching
/// the possibly large primary output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub value: Value,
    pub meta: Option<Value>,
}

impl TaskOutput {
    pub fn new(value: Value) -> Self {
        Self { value, meta: None }
    }

    pub fn with_meta(value: Value, meta: Value) -> Self {
        Self {
            value,
            meta: Some(meta),
        }
    }
}

/// Loaded outputs of a task's upstream dependencies, keyed by kind.
#[derive(Debug, Default)]
pub struct TaskInputs {
    outputs: HashMap<String, Value>,
}

impl TaskInputs {
    pub fn insert(&mut self, kind: impl Into<String>, value: Value) {
        self.outputs.insert(kind.into(), value);
    }

    pub fn get(&self, kind: &str) -> Option<&Value> {
        self.outputs.get(kind)
    }

    /// A missing required input means the runner scheduled us without our
    /// dependency's result in the store.
    pub fn require(&self, kind: &str) -> Result<&Value, PipelineError> {
        self.outputs
            .get(kind)
            .ok_or_else(|| PipelineError::NotFound(kind.to_string()))
    }

    /// Require and deserialize the output of an upstream task.
    pub fn decode<T: DeserializeOwned>(&self, kind: &str) -> Result<T, PipelineError> {
        let value = self.require(kind)?;
        Ok(serde_json::from_value(value.clone())?)
    }
}
