pub mod cli;
pub mod error;
pub mod exec;
pub mod git;
pub mod github;
pub mod insights;
pub mod model;
pub mod report;
pub mod util;
