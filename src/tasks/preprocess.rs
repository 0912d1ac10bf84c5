use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::data::RawRating;
use crate::runtime::identity::Params;
use crate::runtime::task::{Task, TaskInputs, TaskOutput};
use crate::tasks::get_data::GetDataTask;

/// Cleaned ratings split into a training and a held-out test set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingTable {
    pub train: Vec<RawRating>,
    pub test: Vec<RawRating>,
}

/// Pre-processing stage: drops out-of-range ratings, deduplicates
/// (user, movie) pairs keeping the latest, and splits deterministically
/// so the same input always yields the same table.
#[derive(Debug, Default)]
pub struct PreProcessTask;

impl PreProcessTask {
    pub const KIND: &'static str = "preprocess";

    // Every fifth record (in timestamp order) is held out.
    const TEST_STRIDE: usize = 5;
}

#[async_trait]
impl Task for PreProcessTask {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn run(&self, _params: &Params, inputs: &TaskInputs) -> Result<TaskOutput> {
        let raw: Vec<RawRating> = inputs.decode(GetDataTask::KIND)?;
        let raw_count = raw.len();

        // Keep only valid ratings; on duplicates, the latest timestamp wins.
        let mut latest: BTreeMap<(u32, String), RawRating> = BTreeMap::new();
        for record in raw {
            if !(0.5..=5.0).contains(&record.rating) || record.movie.is_empty() {
                continue;
            }
            let key = (record.user, record.movie.clone());
            match latest.get(&key) {
                Some(kept) if kept.timestamp >= record.timestamp => {}
                _ => {
                    latest.insert(key, record);
                }
            }
        }

        let mut cleaned: Vec<RawRating> = latest.into_values().collect();
        cleaned.sort_by(|a, b| {
            (a.timestamp, a.user, a.movie.as_str()).cmp(&(b.timestamp, b.user, b.movie.as_str()))
        });

        let mut train = Vec::new();
        let mut test = Vec::new();
        for (idx, record) in cleaned.into_iter().enumerate() {
            if (idx + 1) % Self::TEST_STRIDE == 0 {
                test.push(record);
            } else {
                train.push(record);
            }
        }

        info!(
            raw = raw_count,
            train = train.len(),
            test = test.len(),
            "pre-processed ratings"
        );

        let meta = json!({
            "raw": raw_count,
            "train": train.len(),
            "test": test.len(),
        });
        let table = RatingTable { train, test };
        Ok(TaskOutput::with_meta(serde_json::to_value(&table)?, meta))
    }
}
