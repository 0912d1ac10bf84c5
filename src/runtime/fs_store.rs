use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::runtime::identity::TaskId;
use crate::runtime::store::ResultStore;

/// File-backed store: one JSON file per identity and channel.
///
/// Writes go to a uniquely named temporary sibling first and are renamed
/// into place. Rename is atomic on the same filesystem, so a reader sees
/// either no entry or a fully written one, and two writers racing on the
/// same identity leave one intact winner rather than an interleaved file.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn output_path(&self, id: &TaskId) -> PathBuf {
        self.root.join(format!("{}.out.json", encode_key(&id.key())))
    }

    fn meta_path(&self, id: &TaskId) -> PathBuf {
        self.root.join(format!("{}.meta.json", encode_key(&id.key())))
    }

    async fn write_atomic(&self, path: &Path, value: &Value) -> Result<(), PipelineError> {
        let tmp = self
            .root
            .join(format!(".tmp-{}", Uuid::new_v4()));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "persisted entry");
        Ok(())
    }

    async fn read(&self, path: &Path, key: &str) -> Result<Value, PipelineError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ResultStore for FsStore {
    async fn save(&self, id: &TaskId, output: &Value) -> Result<(), PipelineError> {
        self.write_atomic(&self.output_path(id), output).await
    }

    async fn load(&self, id: &TaskId) -> Result<Value, PipelineError> {
        self.read(&self.output_path(id), &id.key()).await
    }

    async fn exists(&self, id: &TaskId) -> Result<bool, PipelineError> {
        Ok(tokio::fs::try_exists(&self.output_path(id)).await?)
    }

    async fn save_meta(&self, id: &TaskId, meta: &Value) -> Result<(), PipelineError> {
        self.write_atomic(&self.meta_path(id), meta).await
    }

    async fn load_meta(&self, id: &TaskId) -> Result<Value, PipelineError> {
        self.read(&self.meta_path(id), &id.key()).await
    }
}

/// Collision-free file name for an identity key. Every byte outside
/// `[A-Za-z0-9._-]` is percent-encoded (`%` included), so the encoding is
/// injective: distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
