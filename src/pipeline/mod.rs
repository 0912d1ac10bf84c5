pub mod builder;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::runtime::identity::{Params, TaskId};

/// A declared pipeline: its tasks and their upstream edges, as plain data.
///
/// Dependencies are an explicit adjacency structure built at startup (or
/// loaded from YAML), not discovered through reflection. The declaration
/// carries no executable code; task kinds are bound to implementations by
/// the runner's registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub tasks: Vec<TaskDecl>,
}

/// One declared task: kind, parameter bindings, and the kinds it needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDecl {
    pub kind: String,
    #[serde(default)]
    pub params: Params,
    /// Upstream task kinds, in declaration order. Order matters: the
    /// resolver breaks topological ties by it.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl Pipeline {
    pub fn decl(&self, kind: &str) -> Option<&TaskDecl> {
        self.tasks.iter().find(|t| t.kind == kind)
    }

    /// Identity of a declared task: its kind plus its declared bindings.
    pub fn identity(&self, kind: &str) -> Result<TaskId, PipelineError> {
        let decl = self
            .decl(kind)
            .ok_or_else(|| PipelineError::UnknownTask(kind.to_string()))?;
        Ok(TaskId::new(decl.kind.clone(), decl.params.clone()))
    }

    /// Clone of this pipeline with one task's bindings replaced. Variant
    /// sweeps use this to vary a single task while every other identity
    /// stays the same (and so stays shared in the store).
    pub fn with_params(&self, kind: &str, params: Params) -> Result<Pipeline, PipelineError> {
        let mut patched = self.clone();
        let decl = patched
            .tasks
            .iter_mut()
            .find(|t| t.kind == kind)
            .ok_or_else(|| PipelineError::UnknownTask(kind.to_string()))?;
        decl.params = params;
        Ok(patched)
    }
}
