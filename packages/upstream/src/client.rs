use futures::stream::{self, StreamExt};
use reqwest::Url;
use tracing::{debug, error, info, instrument, warn};

use common::{DeliveryAttempt, Message};

use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::fetch::{FetchOutcome, FetchRequest, UpstreamRecord};

/// HTTP client for the paginated attempts and messages collections.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub async fn fetch_attempts(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchOutcome<DeliveryAttempt>, FetchError> {
        self.fetch(request).await
    }

    pub async fn fetch_messages(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchOutcome<Message>, FetchError> {
        self.fetch(request).await
    }

    /// Issue every page of `request`, at most `request.parallelism` at a time.
    ///
    /// A failing page contributes nothing and is logged; only a fetch where
    /// every page failed is an error. Records outside the request window are
    /// discarded. Duplicates are left for the aggregation engine.
    #[instrument(skip(self, request), fields(
        resource = T::RESOURCE,
        project_id = %request.project_id,
        webhook_id = %request.webhook_id,
    ))]
    pub async fn fetch<T: UpstreamRecord>(
        &self,
        request: &FetchRequest,
    ) -> Result<FetchOutcome<T>, FetchError> {
        request.validate()?;
        let token = self.config.token().ok_or_else(|| {
            FetchError::Misconfiguration("upstream API token is not configured".into())
        })?;
        let url = self.collection_url(request, T::RESOURCE)?;

        let offsets = request.page_offsets();
        let pages_requested = offsets.len();

        let pages: Vec<(u32, Result<Vec<T>, reqwest::Error>)> = stream::iter(offsets)
            .map(|offset| {
                let url = url.clone();
                async move {
                    let result = self.fetch_page::<T>(url, token, request, offset).await;
                    (offset, result)
                }
            })
            .buffered(request.parallelism.max(1))
            .collect()
            .await;

        let mut records = Vec::new();
        let mut pages_failed = 0usize;
        for (offset, result) in pages {
            match result {
                Ok(page) => {
                    let fetched = page.len();
                    records.extend(
                        page.into_iter()
                            .filter(|record| request.window.contains(record.created_at())),
                    );
                    debug!(offset, fetched, "Fetched upstream page");
                }
                Err(e) => {
                    pages_failed += 1;
                    warn!(offset, error = %e, "Upstream page request failed, treating as empty");
                }
            }
        }

        if pages_requested > 0 && pages_failed == pages_requested {
            error!(pages = pages_requested, "Every upstream page request failed");
            return Err(FetchError::UpstreamUnavailable {
                pages: pages_requested,
            });
        }

        let has_more = request.max_pages > 0 && pages_requested == request.max_pages as usize;

        info!(
            records = records.len(),
            pages_requested, pages_failed, has_more, "Upstream fetch complete"
        );

        Ok(FetchOutcome {
            records,
            has_more,
            pages_requested,
            pages_failed,
            window: request.window,
        })
    }

    async fn fetch_page<T: UpstreamRecord>(
        &self,
        url: Url,
        token: &str,
        request: &FetchRequest,
        offset: u32,
    ) -> Result<Vec<T>, reqwest::Error> {
        let mut query: Vec<(&str, String)> = vec![
            ("offset", offset.to_string()),
            ("limit", request.page_size.to_string()),
        ];
        if let Some(before) = request.before {
            query.push(("before", before.to_rfc3339()));
        }

        self.http
            .get(url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<T>>()
            .await
    }

    fn collection_url(&self, request: &FetchRequest, resource: &str) -> Result<Url, FetchError> {
        let invalid = || {
            FetchError::Misconfiguration(format!(
                "invalid upstream base URL '{}'",
                self.config.base_url
            ))
        };

        let mut url = Url::parse(&self.config.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend([
                self.config.api_version.as_str(),
                "hooks",
                "projects",
                request.project_id.as_str(),
                request.webhook_id.as_str(),
                resource,
            ]);
        Ok(url)
    }
}
