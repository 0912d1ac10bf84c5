use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::data::DataSource;
use crate::runtime::identity::Params;
use crate::runtime::task::{Task, TaskInputs, TaskOutput};

/// Ingest stage: pulls raw rating records from the data source
/// collaborator and hands them on untouched.
#[derive(Debug)]
pub struct GetDataTask {
    source: Arc<dyn DataSource>,
}

impl GetDataTask {
    pub const KIND: &'static str = "get_data";

    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Task for GetDataTask {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn run(&self, _params: &Params, _inputs: &TaskInputs) -> Result<TaskOutput> {
        let records = self.source.load().await?;
        info!(records = records.len(), "ingested raw ratings");
        Ok(TaskOutput::new(serde_json::to_value(&records)?))
    }
}
