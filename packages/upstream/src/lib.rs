pub mod client;
pub mod config;
pub mod error;
pub mod fetch;

pub use client::UpstreamClient;
pub use config::UpstreamConfig;
pub use error::FetchError;
pub use fetch::{FetchOutcome, FetchRequest, MAX_UPSTREAM_OFFSET, UpstreamRecord};
