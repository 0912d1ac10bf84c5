use std::collections::HashMap;

use tracing::debug;

use crate::error::PipelineError;
use crate::pipeline::{Pipeline, TaskDecl};
use crate::runtime::identity::TaskId;
use crate::runtime::store::ResultStore;

/// One entry of an execution plan. Tasks whose output already exists stay
/// in the plan flagged `already_complete` so the run report can show them
/// as skipped.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub id: TaskId,
    pub already_complete: bool,
}

/// Ordered plan for one target: every dependency precedes its dependents,
/// ties broken by declaration order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Steps that still need to run.
    pub fn pending(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| !s.already_complete)
    }
}

/// Computes execution plans over a pipeline's declared edges.
///
/// A complete task is trusted as complete: the walk prunes below it and
/// never re-validates its ancestors. Recomputation is driven only by
/// absence of output (or by differing parameter bindings, which are a
/// different identity altogether), never by upstream content changes.
pub struct Resolver<'a> {
    pipeline: &'a Pipeline,
    store: &'a dyn ResultStore,
}

enum Frame {
    Enter(String),
    Exit(String),
}

#[derive(PartialEq)]
enum Visit {
    InProgress,
    Done,
}

impl<'a> Resolver<'a> {
    pub fn new(pipeline: &'a Pipeline, store: &'a dyn ResultStore) -> Self {
        Self { pipeline, store }
    }

    pub async fn resolve(&self, target: &str) -> Result<ExecutionPlan, PipelineError> {
        let mut index: HashMap<&str, &TaskDecl> = HashMap::new();
        for decl in &self.pipeline.tasks {
            index.entry(decl.kind.as_str()).or_insert(decl);
        }

        let mut plan = ExecutionPlan::default();
        let mut state: HashMap<String, Visit> = HashMap::new();
        let mut stack = vec![Frame::Enter(target.to_string())];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(kind) => {
                    match state.get(&kind) {
                        Some(Visit::Done) => continue,
                        Some(Visit::InProgress) => {
                            return Err(PipelineError::CyclicDependency(kind));
                        }
                        None => {}
                    }

                    let decl = index
                        .get(kind.as_str())
                        .ok_or_else(|| PipelineError::UnknownTask(kind.clone()))?;
                    let id = TaskId::new(decl.kind.clone(), decl.params.clone());

                    if self.store.exists(&id).await? {
                        debug!(task = %id, "already complete, pruning");
                        state.insert(kind, Visit::Done);
                        plan.steps.push(PlanStep {
                            id,
                            already_complete: true,
                        });
                        continue;
                    }

                    state.insert(kind.clone(), Visit::InProgress);
                    stack.push(Frame::Exit(kind));
                    // Reversed so the first-declared dependency is walked
                    // first, keeping the order deterministic.
                    for dep in decl.depends_on.iter().rev() {
                        stack.push(Frame::Enter(dep.clone()));
                    }
                }
                Frame::Exit(kind) => {
                    let decl = index
                        .get(kind.as_str())
                        .ok_or_else(|| PipelineError::UnknownTask(kind.clone()))?;
                    state.insert(kind, Visit::Done);
                    plan.steps.push(PlanStep {
                        id: TaskId::new(decl.kind.clone(), decl.params.clone()),
                        already_complete: false,
                    });
                }
            }
        }

        Ok(plan)
    }
}
