use thiserror::Error;

use crate::runtime::identity::TaskId;

/// Failure taxonomy of the pipeline core.
///
/// Structural errors (`CyclicDependency`, `UnknownTask`) are raised while
/// resolving a target, before any task runs. `InvalidParameter` is a fatal
/// configuration error and is never retried. Nothing in the core swallows
/// or retries an error; everything carries enough identity to point at the
/// failing invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid parameter `{param}` for task `{task}`: {reason}")]
    InvalidParameter {
        task: String,
        param: String,
        reason: String,
    },

    #[error("no stored result for `{0}`")]
    NotFound(String),

    #[error("cyclic dependency through task `{0}`")]
    CyclicDependency(String),

    #[error("unknown task kind `{0}`")]
    UnknownTask(String),

    #[error("task `{task}` failed: {cause}")]
    TaskRunFailure { task: TaskId, cause: anyhow::Error },

    #[error("store i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn invalid_parameter(
        task: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            task: task.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }
}
