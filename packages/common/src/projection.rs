//! Stateless search, status filtering, sorting and pagination over an
//! aggregate collection.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::MessageAggregate;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// Delivery status bucket of an aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    /// Every attempt succeeded.
    Success,
    /// Every attempt failed.
    Failed,
    /// Some attempts failed.
    Partial,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }

    pub fn matches(&self, aggregate: &MessageAggregate) -> bool {
        match self {
            Self::All => true,
            Self::Success => aggregate.is_fully_successful(),
            Self::Failed => aggregate.is_fully_failed(),
            Self::Partial => !aggregate.is_fully_successful() && !aggregate.is_fully_failed(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "partial" => Ok(Self::Partial),
            _ => Err(format!(
                "Invalid status '{}'. Must be one of 'all', 'success', 'failed', 'partial'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    MessageId,
    DocumentId,
    OldestAttempt,
    #[default]
    NewestAttempt,
    AttemptCount,
    SuccessRate,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "messageId" => Ok(Self::MessageId),
            "documentId" => Ok(Self::DocumentId),
            "oldestAttempt" => Ok(Self::OldestAttempt),
            "newestAttempt" => Ok(Self::NewestAttempt),
            "attemptCount" => Ok(Self::AttemptCount),
            "successRate" => Ok(Self::SuccessRate),
            _ => Err(format!("Invalid sort key '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("Invalid sort direction '{}'. Must be 'asc' or 'desc'", s)),
        }
    }
}

/// Parameters of one view over the aggregate collection.
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub search: Option<String>,
    pub status: StatusFilter,
    pub sort: SortKey,
    pub direction: SortDirection,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
}

/// One page of aggregates plus the size of the filtered collection.
#[derive(Debug, Clone)]
pub struct ViewPage<'a> {
    pub items: Vec<&'a MessageAggregate>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// Case-insensitive substring match over message id, document id and the
/// hook ids of member attempts.
pub fn matches_search(aggregate: &MessageAggregate, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if needle.is_empty() {
        return true;
    }

    aggregate.message_id.to_lowercase().contains(&needle)
        || aggregate
            .document_id
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
        || aggregate
            .attempts
            .iter()
            .any(|a| a.hook_id.to_lowercase().contains(&needle))
}

fn compare(a: &MessageAggregate, b: &MessageAggregate, key: SortKey) -> Ordering {
    match key {
        SortKey::MessageId => a.message_id.cmp(&b.message_id),
        SortKey::DocumentId => a.document_id.cmp(&b.document_id),
        SortKey::OldestAttempt => a.oldest_attempt.cmp(&b.oldest_attempt),
        SortKey::NewestAttempt => a.newest_attempt.cmp(&b.newest_attempt),
        SortKey::AttemptCount => a.attempt_count.cmp(&b.attempt_count),
        SortKey::SuccessRate => a.success_rate.total_cmp(&b.success_rate),
    }
}

/// Filter, sort and paginate `aggregates`.
pub fn project<'a>(aggregates: &'a [MessageAggregate], query: &ViewQuery) -> ViewPage<'a> {
    let search = query.search.as_deref().map(str::trim).unwrap_or_default();

    let mut items: Vec<&MessageAggregate> = aggregates
        .iter()
        .filter(|a| query.status.matches(a))
        .filter(|a| matches_search(a, search))
        .collect();

    items.sort_by(|a, b| {
        let ordering = match query.direction {
            SortDirection::Asc => compare(a, b, query.sort),
            SortDirection::Desc => compare(b, a, query.sort),
        };
        ordering.then_with(|| a.message_id.cmp(&b.message_id))
    });

    let page = query.page.max(1);
    let per_page = if query.per_page == 0 {
        DEFAULT_PER_PAGE
    } else {
        query.per_page.min(MAX_PER_PAGE)
    };
    let total = items.len() as u64;
    let total_pages = total.div_ceil(per_page);

    let skip = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
    let items = items
        .into_iter()
        .skip(skip)
        .take(per_page as usize)
        .collect();

    ViewPage {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}
