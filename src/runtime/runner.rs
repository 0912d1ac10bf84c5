use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::runtime::identity::TaskId;
use crate::runtime::resolver::Resolver;
use crate::runtime::store::ResultStore;
use crate::runtime::task::{Task, TaskInputs};

/// Executes pipelines: resolves the plan for a target, then runs pending
/// tasks strictly sequentially in dependency order, persisting each output
/// (and metadata) before moving on.
///
/// No retries. A failed task halts everything that transitively depends on
/// it; whatever was already saved stays in the store, so a re-invocation
/// after a fix resumes where the failure happened.
pub struct Runner {
    tasks: HashMap<String, Arc<dyn Task>>,
    store: Arc<dyn ResultStore>,
}

impl Runner {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            tasks: HashMap::new(),
            store,
        }
    }

    pub fn register_task(&mut self, task: Arc<dyn Task>) {
        self.tasks.insert(task.kind().to_string(), task);
    }

    pub fn store(&self) -> Arc<dyn ResultStore> {
        self.store.clone()
    }

    pub async fn run(&self, pipeline: &Pipeline, target: &str) -> Result<RunReport, PipelineError> {
        let plan = Resolver::new(pipeline, self.store.as_ref())
            .resolve(target)
            .await?;

        // Structural check up front: every pending kind must be bound to an
        // implementation before anything runs.
        for step in plan.pending() {
            if !self.tasks.contains_key(&step.id.kind) {
                return Err(PipelineError::UnknownTask(step.id.kind.clone()));
            }
        }

        let mut report = RunReport::new(target);
        let mut blocked: HashSet<String> = HashSet::new();

        for step in &plan.steps {
            if step.already_complete {
                info!(task = %step.id, "skipped, already complete");
                report.push(step.id.clone(), TaskStatus::Skipped);
                continue;
            }

            let decl = pipeline
                .decl(&step.id.kind)
                .ok_or_else(|| PipelineError::UnknownTask(step.id.kind.clone()))?;

            // A failed upstream means this task is never scheduled.
            if decl.depends_on.iter().any(|dep| blocked.contains(dep)) {
                blocked.insert(step.id.kind.clone());
                continue;
            }

            let task = self
                .tasks
                .get(&step.id.kind)
                .ok_or_else(|| PipelineError::UnknownTask(step.id.kind.clone()))?;

            if let Err(e) = task.validate(&step.id.params) {
                error!(task = %step.id, error = %e, "parameter validation failed");
                blocked.insert(step.id.kind.clone());
                report.push(step.id.clone(), TaskStatus::Failed(e));
                continue;
            }

            let mut inputs = TaskInputs::default();
            for dep in &decl.depends_on {
                let dep_id = pipeline.identity(dep)?;
                inputs.insert(dep.clone(), self.store.load(&dep_id).await?);
            }

            info!(task = %step.id, "running task");
            match task.run(&step.id.params, &inputs).await {
                Ok(output) => {
                    self.store.save(&step.id, &output.value).await?;
                    if let Some(meta) = &output.meta {
                        self.store.save_meta(&step.id, meta).await?;
                    }
                    report.push(step.id.clone(), TaskStatus::Completed);
                }
                Err(cause) => {
                    error!(task = %step.id, error = %cause, "task failed");
                    blocked.insert(step.id.kind.clone());
                    report.push(
                        step.id.clone(),
                        TaskStatus::Failed(PipelineError::TaskRunFailure {
                            task: step.id.clone(),
                            cause,
                        }),
                    );
                }
            }
        }

        Ok(report)
    }
}

#[derive(Debug)]
pub enum TaskStatus {
    /// A result already existed for this identity; nothing ran.
    Skipped,
    Completed,
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct TaskReport {
    pub id: TaskId,
    pub status: TaskStatus,
}

/// Per-task outcome of one runner invocation. Tasks downstream of a
/// failure were never scheduled and have no entry.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub target: String,
    pub entries: Vec<TaskReport>,
}

impl RunReport {
    fn new(target: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target: target.to_string(),
            entries: Vec::new(),
        }
    }

    fn push(&mut self, id: TaskId, status: TaskStatus) {
        self.entries.push(TaskReport { id, status });
    }

    /// Overall success requires zero failures.
    pub fn is_success(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|e| matches!(e.status, TaskStatus::Failed(_)))
    }

    pub fn status_of(&self, kind: &str) -> Option<&TaskStatus> {
        self.entries
            .iter()
            .find(|e| e.id.kind == kind)
            .map(|e| &e.status)
    }

    /// Identities that actually ran (not skipped, not failed).
    pub fn executed(&self) -> Vec<&TaskId> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, TaskStatus::Completed))
            .map(|e| &e.id)
            .collect()
    }

    pub fn failures(&self) -> Vec<(&TaskId, &PipelineError)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.status {
                TaskStatus::Failed(err) => Some((&e.id, err)),
                _ => None,
            })
            .collect()
    }
}
