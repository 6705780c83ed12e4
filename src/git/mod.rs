pub mod complexity;
pub mod repo;

pub use repo::{CommitWalk, GitRepo};
