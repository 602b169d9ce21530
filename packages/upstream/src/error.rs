use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// A required identifier was absent or blank.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Credentials or connection settings are missing or invalid.
    #[error("Upstream misconfigured: {0}")]
    Misconfiguration(String),

    /// Every page request failed.
    #[error("Upstream unavailable: all {pages} page requests failed")]
    UpstreamUnavailable { pages: usize },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
