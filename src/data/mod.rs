use std::fmt::Debug;
use std::path::PathBuf;

use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One raw rating event as it arrives from the outside world: movie
/// referenced by display name, not yet cleaned or ID-mapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRating {
    pub user: u32,
    pub movie: String,
    pub rating: f64,
    pub timestamp: i64,
}

/// Raw data collaborator: a single `load` the ingest task calls. Format
/// and transport are the source's business, not the pipeline's.
#[async_trait]
pub trait DataSource: Send + Sync + Debug {
    async fn load(&self) -> Result<Vec<RawRating>>;
}

/// Reads `user::movie name::rating::timestamp` lines from a file.
/// Blank lines and `#` comments are ignored.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn load(&self) -> Result<Vec<RawRating>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read ratings from {}", self.path.display()))?;

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            records.push(
                parse_line(line)
                    .with_context(|| format!("Bad rating record at line {}", line_no + 1))?,
            );
        }
        Ok(records)
    }
}

fn parse_line(line: &str) -> Result<RawRating> {
    let mut fields = line.splitn(4, "::");
    let user = fields
        .next()
        .context("missing user field")?
        .trim()
        .parse::<u32>()
        .context("user is not an integer")?;
    let movie = fields.next().context("missing movie field")?.trim();
    let rating = fields
        .next()
        .context("missing rating field")?
        .trim()
        .parse::<f64>()
        .context("rating is not a number")?;
    let timestamp = fields
        .next()
        .context("missing timestamp field")?
        .trim()
        .parse::<i64>()
        .context("timestamp is not an integer")?;

    Ok(RawRating {
        user,
        movie: movie.to_string(),
        rating,
        timestamp,
    })
}

/// Fixed in-memory records, for tests and demos.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: Vec<RawRating>,
}

impl MemorySource {
    pub fn new(records: Vec<RawRating>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn load(&self) -> Result<Vec<RawRating>> {
        Ok(self.records.clone())
    }
}
