use serde_json::Value;

use crate::pipeline::{Pipeline, TaskDecl};
use crate::runtime::identity::Params;

/// Fluent construction of a [`Pipeline`] declaration.
pub struct PipelineBuilder {
    id: String,
    name: String,
    tasks: Vec<TaskDecl>,
}

impl PipelineBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            tasks: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn task(self, kind: &str) -> TaskDeclBuilder {
        TaskDeclBuilder {
            pipeline_builder: self,
            kind: kind.to_string(),
            params: Params::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            id: self.id,
            name: self.name,
            tasks: self.tasks,
        }
    }
}

pub struct TaskDeclBuilder {
    pipeline_builder: PipelineBuilder,
    kind: String,
    params: Params,
    depends_on: Vec<String>,
}

impl TaskDeclBuilder {
    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Declare an upstream dependency. Call order is preserved and used
    /// for deterministic tie-breaking in the execution order.
    pub fn after(mut self, upstream: &str) -> Self {
        self.depends_on.push(upstream.to_string());
        self
    }

    pub fn build(mut self) -> PipelineBuilder {
        self.pipeline_builder.tasks.push(TaskDecl {
            kind: self.kind,
            params: self.params,
            depends_on: self.depends_on,
        });
        self.pipeline_builder
    }
}
