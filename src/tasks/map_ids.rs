use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::RawRating;
use crate::recommender::MappedRating;
use crate::runtime::identity::Params;
use crate::runtime::task::{Task, TaskInputs, TaskOutput};
use crate::tasks::preprocess::{PreProcessTask, RatingTable};

/// Sentinel ID for movies that never appeared in the training set.
pub const UNKNOWN_MOVIE_ID: u32 = 0;

/// Movie-name → numeric-ID assignment, built from training data only.
/// Lookups of unseen names return `None`; callers decide what the
/// fallback means instead of mutating a shared map behind the scenes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieIndex {
    ids: BTreeMap<String, u32>,
}

impl MovieIndex {
    pub fn from_names<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        let mut unique: Vec<&str> = names.collect();
        unique.sort_unstable();
        unique.dedup();
        // IDs start at 1; 0 is the unknown-movie sentinel.
        let ids = unique
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx as u32 + 1))
            .collect();
        Self { ids }
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Fully numeric dataset handed to the training stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedData {
    pub index: MovieIndex,
    pub train: Vec<MappedRating>,
    pub test: Vec<MappedRating>,
}

/// ID-mapping stage: replaces movie names with stable numeric IDs.
#[derive(Debug, Default)]
pub struct MapMovieIdsTask;

impl MapMovieIdsTask {
    pub const KIND: &'static str = "map_movie_ids";
}

fn map_records(records: &[RawRating], index: &MovieIndex) -> (Vec<MappedRating>, usize) {
    let mut unknown = 0;
    let mapped = records
        .iter()
        .map(|r| {
            let movie = index.lookup(&r.movie).unwrap_or_else(|| {
                unknown += 1;
                UNKNOWN_MOVIE_ID
            });
            MappedRating {
                user: r.user,
                movie,
                rating: r.rating,
            }
        })
        .collect();
    (mapped, unknown)
}

#[async_trait]
impl Task for MapMovieIdsTask {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn run(&self, _params: &Params, inputs: &TaskInputs) -> Result<TaskOutput> {
        let table: RatingTable = inputs.decode(PreProcessTask::KIND)?;

        let index = MovieIndex::from_names(table.train.iter().map(|r| r.movie.as_str()));
        let (train, _) = map_records(&table.train, &index);
        let (test, unknown_in_test) = map_records(&table.test, &index);

        if unknown_in_test > 0 {
            warn!(
                unknown = unknown_in_test,
                "test ratings for movies never seen in training, mapped to sentinel"
            );
        }
        info!(movies = index.len(), "built movie index");

        let data = MappedData { index, train, test };
        Ok(TaskOutput::new(serde_json::to_value(&data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_assigns_sorted_ids_from_one() {
        let index = MovieIndex::from_names(["Heat", "Alien", "Heat"].into_iter());
        assert_eq!(index.lookup("Alien"), Some(1));
        assert_eq!(index.lookup("Heat"), Some(2));
        assert_eq!(index.lookup("Brazil"), None);
        assert_eq!(index.len(), 2);
    }
}
