//! The demonstration workflow: a four-stage movie-rating pipeline,
//! ingest → pre-process → ID mapping → train, chained linearly.

pub mod get_data;
pub mod map_ids;
pub mod preprocess;
pub mod train;

pub use get_data::GetDataTask;
pub use map_ids::MapMovieIdsTask;
pub use preprocess::PreProcessTask;
pub use train::TrainModelTask;

use crate::pipeline::builder::PipelineBuilder;
use crate::pipeline::Pipeline;

/// The movie-rating pipeline declaration. The train stage defaults to
/// `svd`; sweeps rebind it per variant.
pub fn movie_pipeline() -> Pipeline {
    PipelineBuilder::new("movie-ratings")
        .name("Movie rating prediction")
        .task(GetDataTask::KIND)
        .build()
        .task(PreProcessTask::KIND)
        .after(GetDataTask::KIND)
        .build()
        .task(MapMovieIdsTask::KIND)
        .after(PreProcessTask::KIND)
        .build()
        .task(TrainModelTask::KIND)
        .param(TrainModelTask::PARAM_MODEL, "svd")
        .after(MapMovieIdsTask::KIND)
        .build()
        .build()
}
