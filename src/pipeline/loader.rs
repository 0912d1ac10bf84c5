use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context as AnyhowContext, Result};

use crate::pipeline::Pipeline;

pub fn load_pipeline_from_yaml(file_path: impl AsRef<Path>) -> Result<Pipeline> {
    let file_path = file_path.as_ref();
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read YAML file from {}", file_path.display()))?;

    pipeline_from_yaml_str(&yaml_content)
        .with_context(|| format!("Failed to load pipeline from {}", file_path.display()))
}

pub fn pipeline_from_yaml_str(yaml_content: &str) -> Result<Pipeline> {
    let pipeline: Pipeline =
        serde_yaml::from_str(yaml_content).context("Failed to deserialize YAML content")?;

    // Kinds double as identity and edge targets, so they must be unique.
    let mut seen = HashSet::new();
    for task in &pipeline.tasks {
        if !seen.insert(task.kind.as_str()) {
            bail!("Duplicate task kind: {}", task.kind);
        }
    }

    Ok(pipeline)
}
