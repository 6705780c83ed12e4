pub mod client;
pub mod pulls;

pub use client::{ApiClient, ClientConfig};
pub use pulls::PullRequestExtractor;
