use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::error::PipelineError;
use crate::recommender::{ModelKind, ModelTrainer};
use crate::runtime::identity::Params;
use crate::runtime::task::{Task, TaskInputs, TaskOutput};
use crate::tasks::map_ids::{MapMovieIdsTask, MappedData};

/// Training stage: fits the requested model on the mapped training set
/// and scores it on the held-out set. The fitted model is the output;
/// the RMSE travels on the metadata channel so sweeps can compare
/// variants without loading every model.
#[derive(Debug)]
pub struct TrainModelTask {
    trainer: Arc<dyn ModelTrainer>,
}

impl TrainModelTask {
    pub const KIND: &'static str = "train_model";
    pub const PARAM_MODEL: &'static str = "model";

    pub fn new(trainer: Arc<dyn ModelTrainer>) -> Self {
        Self { trainer }
    }

    fn model_kind(params: &Params) -> Result<ModelKind, PipelineError> {
        let raw = params
            .get(Self::PARAM_MODEL)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                PipelineError::invalid_parameter(
                    Self::KIND,
                    Self::PARAM_MODEL,
                    "missing or not a string",
                )
            })?;
        ModelKind::parse(raw).ok_or_else(|| {
            PipelineError::invalid_parameter(
                Self::KIND,
                Self::PARAM_MODEL,
                format!("unrecognized model `{}` (expected svd, svdpp or nmf)", raw),
            )
        })
    }
}

#[async_trait]
impl Task for TrainModelTask {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn validate(&self, params: &Params) -> Result<(), PipelineError> {
        Self::model_kind(params).map(|_| ())
    }

    async fn run(&self, params: &Params, inputs: &TaskInputs) -> Result<TaskOutput> {
        let kind = Self::model_kind(params)?;
        let data: MappedData = inputs.decode(MapMovieIdsTask::KIND)?;

        let model = self.trainer.fit(kind, &data.train)?;
        let rmse = self.trainer.evaluate(&model, &data.test);
        info!(model = kind.as_str(), rmse, "trained and evaluated model");

        let meta = json!({
            "model": kind.as_str(),
            "rmse": rmse,
        });
        Ok(TaskOutput::with_meta(serde_json::to_value(&model)?, meta))
    }
}
