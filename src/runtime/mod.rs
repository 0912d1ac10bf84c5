pub mod fs_store;
pub mod identity;
pub mod resolver;
pub mod runner;
pub mod store;
pub mod sweep;
pub mod task;
