use std::time::Duration;

use serde::Deserialize;

/// Connection settings for the webhook-delivery API.
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// API origin. Default: "https://api.sanity.io".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Dated API version path segment. Default: "v2021-10-04".
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Bearer token. Fetching without one fails with a misconfiguration error.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in seconds. Default: 30.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.sanity.io".into()
}
fn default_api_version() -> String {
    "v2021-10-04".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured token, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
