use chrono::{DateTime, Utc};
use common::{DeliveryAttempt, FetchConfig, Message, TimeWindow};
use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// Offsets past this point are rejected by the upstream API.
pub const MAX_UPSTREAM_OFFSET: u32 = 10_000;

/// A record type served by a paginated upstream collection.
pub trait UpstreamRecord: DeserializeOwned + Send + 'static {
    /// Final path segment of the collection.
    const RESOURCE: &'static str;

    fn created_at(&self) -> DateTime<Utc>;
}

impl UpstreamRecord for DeliveryAttempt {
    const RESOURCE: &'static str = "attempts";

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl UpstreamRecord for Message {
    const RESOURCE: &'static str = "messages";

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// One bounded, paginated fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub project_id: String,
    pub webhook_id: String,
    pub window: TimeWindow,
    /// Forwarded upstream when older data is requested.
    pub before: Option<DateTime<Utc>>,
    pub start_offset: u32,
    pub page_size: u32,
    pub max_pages: u32,
    pub parallelism: usize,
}

impl FetchRequest {
    /// Request the window of `config.window_hours` ending at `before` (or now).
    pub fn new(
        project_id: impl Into<String>,
        webhook_id: impl Into<String>,
        before: Option<DateTime<Utc>>,
        config: &FetchConfig,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            webhook_id: webhook_id.into(),
            window: TimeWindow::ending_at(before, Utc::now(), config.window_span()),
            before,
            start_offset: 0,
            page_size: config.effective_page_size(),
            max_pages: config.max_pages,
            parallelism: config.effective_parallelism(),
        }
    }

    pub fn starting_at(mut self, offset: u32) -> Self {
        self.start_offset = offset;
        self
    }

    /// Override the page size, still capped at the upstream maximum.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.page_size = limit.clamp(1, common::config::MAX_PAGE_SIZE);
        self
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        if self.project_id.trim().is_empty() {
            return Err(FetchError::MissingParameter("projectId"));
        }
        if self.webhook_id.trim().is_empty() {
            return Err(FetchError::MissingParameter("webhookId"));
        }
        Ok(())
    }

    /// Offsets of the pages to request, stopping before the upstream limit.
    pub fn page_offsets(&self) -> Vec<u32> {
        (0..self.max_pages)
            .map_while(|i| {
                let offset = self
                    .start_offset
                    .checked_add(i.checked_mul(self.page_size)?)?;
                (offset.checked_add(self.page_size)? <= MAX_UPSTREAM_OFFSET).then_some(offset)
            })
            .collect()
    }
}

/// Concatenated, window-filtered records from every page of a fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub records: Vec<T>,
    /// Set when every configured page was issued. Deliberately conservative:
    /// the last page may well have been partial.
    pub has_more: bool,
    pub pages_requested: usize,
    pub pages_failed: usize,
    pub window: TimeWindow,
}

impl<T> FetchOutcome<T> {
    /// Whether a request further back in time may return anything.
    pub fn older_data_available(&self) -> bool {
        self.has_more || !self.records.is_empty()
    }
}
