use serde_json::Value;
use tracing::info;

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::runtime::identity::{Params, TaskId};
use crate::runtime::runner::{RunReport, Runner};
use crate::runtime::store::ResultStore;

/// Runs one pipeline target once per named parameter binding.
///
/// Only the target task's bindings are patched per variant, so upstream
/// tasks keep one shared identity across the whole sweep and run at most
/// once in total.
pub struct VariantSweep {
    target: String,
    variants: Vec<(String, Params)>,
}

impl VariantSweep {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            variants: Vec::new(),
        }
    }

    /// Insertion order is preserved; it is the iteration order of every
    /// collector and the tie-break order of [`select_best`].
    pub fn variant(mut self, name: &str, params: Params) -> Self {
        self.variants.push((name.to_string(), params));
        self
    }

    pub async fn run(
        &self,
        runner: &Runner,
        pipeline: &Pipeline,
    ) -> Result<SweepReport, PipelineError> {
        let mut runs = Vec::with_capacity(self.variants.len());
        for (name, params) in &self.variants {
            info!(variant = %name, target = %self.target, "running variant");
            let patched = pipeline.with_params(&self.target, params.clone())?;
            let id = patched.identity(&self.target)?;
            let report = runner.run(&patched, &self.target).await?;
            runs.push(VariantRun {
                name: name.clone(),
                target_id: id,
                report,
            });
        }
        Ok(SweepReport {
            target: self.target.clone(),
            runs,
        })
    }
}

#[derive(Debug)]
pub struct VariantRun {
    pub name: String,
    pub target_id: TaskId,
    pub report: RunReport,
}

#[derive(Debug)]
pub struct SweepReport {
    pub target: String,
    pub runs: Vec<VariantRun>,
}

impl SweepReport {
    pub fn is_success(&self) -> bool {
        self.runs.iter().all(|r| r.report.is_success())
    }

    pub fn report(&self, variant: &str) -> Option<&RunReport> {
        self.runs
            .iter()
            .find(|r| r.name == variant)
            .map(|r| &r.report)
    }

    /// Loads the target's primary output per variant, in variant order.
    pub async fn output_load(
        &self,
        store: &dyn ResultStore,
    ) -> Result<Vec<(String, Value)>, PipelineError> {
        let mut outputs = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            outputs.push((run.name.clone(), store.load(&run.target_id).await?));
        }
        Ok(outputs)
    }

    /// Loads the target's metadata per variant, in variant order, without
    /// touching the primary outputs.
    pub async fn output_load_meta(
        &self,
        store: &dyn ResultStore,
    ) -> Result<Vec<(String, Value)>, PipelineError> {
        let mut metas = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            metas.push((run.name.clone(), store.load_meta(&run.target_id).await?));
        }
        Ok(metas)
    }
}

/// Picks the output whose score is minimal. Pure; ties go to the variant
/// encountered first in `scores` iteration order.
pub fn select_best<'a>(
    outputs: &'a [(String, Value)],
    scores: &[(String, f64)],
) -> Option<(&'a str, &'a Value)> {
    let mut best: Option<(&str, f64)> = None;
    for (name, score) in scores {
        let better = match best {
            None => true,
            Some((_, current)) => *score < current,
        };
        if better {
            best = Some((name.as_str(), *score));
        }
    }
    let (winner, _) = best?;
    outputs
        .iter()
        .find(|(name, _)| name == winner)
        .map(|(name, value)| (name.as_str(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_best_takes_lowest_score() {
        let outputs = vec![
            ("svd".to_string(), json!("svd-model")),
            ("svdpp".to_string(), json!("svdpp-model")),
            ("nmf".to_string(), json!("nmf-model")),
        ];
        let scores = vec![
            ("svd".to_string(), 0.819),
            ("svdpp".to_string(), 0.818),
            ("nmf".to_string(), 0.898),
        ];
        let (name, value) = select_best(&outputs, &scores).unwrap();
        assert_eq!(name, "svdpp");
        assert_eq!(value, &json!("svdpp-model"));
    }

    #[test]
    fn select_best_breaks_ties_by_first_encountered() {
        let outputs = vec![
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
        ];
        let scores = vec![("a".to_string(), 0.5), ("b".to_string(), 0.5)];
        let (name, _) = select_best(&outputs, &scores).unwrap();
        assert_eq!(name, "a");
    }

    #[test]
    fn select_best_on_empty_is_none() {
        assert!(select_best(&[], &[]).is_none());
    }
}
