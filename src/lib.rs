pub mod data;
pub mod error;
pub mod pipeline;
pub mod recommender;
pub mod runtime;
pub mod tasks;
