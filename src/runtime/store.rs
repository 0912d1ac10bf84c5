use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::PipelineError;
use crate::runtime::identity::TaskId;

// --- Interface ---

/// Persisted task results, keyed by task identity.
///
/// A task is "complete" exactly when its primary output exists here.
/// Metadata is an independent channel under the same key: it may exist
/// without the primary output, though in normal use the runner writes
/// both together.
///
/// Implementations must guarantee one writer at a time per identity and
/// that readers never observe a partially written entry: a reader either
/// sees no entry or a fully written one.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, id: &TaskId, output: &Value) -> Result<(), PipelineError>;

    /// Fails with `NotFound` if no output was saved for this identity.
    async fn load(&self, id: &TaskId) -> Result<Value, PipelineError>;

    async fn exists(&self, id: &TaskId) -> Result<bool, PipelineError>;

    async fn save_meta(&self, id: &TaskId, meta: &Value) -> Result<(), PipelineError>;

    async fn load_meta(&self, id: &TaskId) -> Result<Value, PipelineError>;
}

// --- In-Memory Implementation ---

/// Map-backed store. Inserts into a `DashMap` shard are atomic, so a
/// concurrent reader sees either the previous entry or the new one,
/// never a torn write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    outputs: DashMap<String, Value>,
    metas: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn save(&self, id: &TaskId, output: &Value) -> Result<(), PipelineError> {
        self.outputs.insert(id.key(), output.clone());
        Ok(())
    }

    async fn load(&self, id: &TaskId) -> Result<Value, PipelineError> {
        self.outputs
            .get(&id.key())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PipelineError::NotFound(id.key()))
    }

    async fn exists(&self, id: &TaskId) -> Result<bool, PipelineError> {
        Ok(self.outputs.contains_key(&id.key()))
    }

    async fn save_meta(&self, id: &TaskId, meta: &Value) -> Result<(), PipelineError> {
        self.metas.insert(id.key(), meta.clone());
        Ok(())
    }

    async fn load_meta(&self, id: &TaskId) -> Result<Value, PipelineError> {
        self.metas
            .get(&id.key())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PipelineError::NotFound(id.key()))
    }
}
