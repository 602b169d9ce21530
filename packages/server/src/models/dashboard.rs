use chrono::{DateTime, Utc};
use common::projection::{SortDirection, SortKey, StatusFilter, ViewQuery};
use common::{DecodeFailure, MessageAggregate, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::monitor::{MonitorSession, SessionSummary};

use super::shared::Pagination;

/// Query parameters shared by the dashboard endpoints.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct DashboardParams {
    #[param(example = "abc123")]
    pub project_id: Option<String>,
    #[param(example = "hook-xyz")]
    pub webhook_id: Option<String>,
    /// Case-insensitive match on message id, document id or hook id.
    pub search: Option<String>,
    /// One of `all`, `success`, `failed`, `partial`.
    #[param(example = "failed")]
    pub status: Option<String>,
    /// One of `messageId`, `documentId`, `oldestAttempt`, `newestAttempt`,
    /// `attemptCount`, `successRate`.
    #[param(example = "newestAttempt")]
    pub sort: Option<String>,
    /// `asc` or `desc`.
    #[param(example = "desc")]
    pub direction: Option<String>,
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

impl DashboardParams {
    pub fn view_query(&self) -> Result<ViewQuery, AppError> {
        fn parse<T: std::str::FromStr<Err = String> + Default>(
            value: Option<&str>,
        ) -> Result<T, AppError> {
            value
                .map(|v| v.parse::<T>())
                .transpose()
                .map(Option::unwrap_or_default)
                .map_err(AppError::Validation)
        }

        Ok(ViewQuery {
            search: self.search.clone(),
            status: parse::<StatusFilter>(self.status.as_deref())?,
            sort: parse::<SortKey>(self.sort.as_deref())?,
            direction: parse::<SortDirection>(self.direction.as_deref())?,
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(20).clamp(1, 100),
        })
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[schema(example = 120)]
    pub messages: usize,
    #[schema(example = 340)]
    pub attempts: usize,
    /// Messages with at least one failed attempt.
    #[schema(example = 7)]
    pub messages_with_failures: usize,
    #[schema(example = 1)]
    pub large_payload_failures: usize,
}

impl From<SessionSummary> for DashboardSummary {
    fn from(s: SessionSummary) -> Self {
        Self {
            messages: s.messages,
            attempts: s.attempts,
            messages_with_failures: s.messages_with_failures,
            large_payload_failures: s.large_payload_failures,
        }
    }
}

/// One view of a monitoring session.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub aggregates: Vec<MessageAggregate>,
    pub pagination: Pagination,
    pub messages_with_errors: Vec<DecodeFailure>,
    /// Span of data loaded so far. Null before the first fetch or when
    /// restored from a snapshot.
    pub window: Option<TimeWindow>,
    pub has_more_data: bool,
    /// Whether the data came from the persisted snapshot.
    pub from_cache: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub summary: DashboardSummary,
}

impl DashboardResponse {
    pub fn from_session(session: &MonitorSession, query: &ViewQuery) -> Self {
        let page = session.view(query);
        Self {
            aggregates: page.items.into_iter().cloned().collect(),
            pagination: Pagination {
                page: page.page,
                per_page: page.per_page,
                total: page.total,
                total_pages: page.total_pages,
            },
            messages_with_errors: session.decode_failures().to_vec(),
            window: session.window(),
            has_more_data: session.has_more_data(),
            from_cache: session.from_cache(),
            last_updated: session.last_updated(),
            summary: session.summary().into(),
        }
    }

    /// Response for a webhook nothing has been loaded for yet.
    pub fn empty(query: &ViewQuery) -> Self {
        Self {
            aggregates: Vec::new(),
            pagination: Pagination {
                page: query.page.max(1),
                per_page: query.per_page,
                total: 0,
                total_pages: 0,
            },
            messages_with_errors: Vec::new(),
            window: None,
            has_more_data: false,
            from_cache: false,
            last_updated: None,
            summary: DashboardSummary {
                messages: 0,
                attempts: 0,
                messages_with_failures: 0,
                large_payload_failures: 0,
            },
        }
    }
}
