//! Per-message rollups of delivery attempts and the merge that maintains them.
//!
//! Every derived field of a [`MessageAggregate`] is recomputed from its full
//! member list whenever that list changes, so the final state depends only on
//! the union of attempts merged so far and never on the order batches arrive.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attempt::DeliveryAttempt;
use crate::decoder::{DecodeFailure, DocumentIdMap};

/// Result code the upstream reports for an oversized payload rejection.
pub const PAYLOAD_TOO_LARGE: i32 = 413;

/// Case-insensitive fragments of failure reasons and response bodies that
/// indicate the target rejected the payload for its size. Best effort: free
/// text from arbitrary webhook targets can both over- and under-match.
const LARGE_PAYLOAD_MARKERS: &[&str] = &["too large", "payload size"];

/// Computed rollup of every attempt observed for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageAggregate {
    pub message_id: String,
    /// Member attempts, ascending by `created_at` (ties by id), unique by id.
    pub attempts: Vec<DeliveryAttempt>,
    pub oldest_attempt: DateTime<Utc>,
    pub newest_attempt: DateTime<Utc>,
    pub attempt_count: usize,
    /// Percentage of member attempts that did not fail, `0.0..=100.0`.
    pub success_rate: f64,
    pub latest_failure: Option<DeliveryAttempt>,
    pub document_id: Option<String>,
    pub parsing_error: Option<String>,
    pub large_payload_failure: bool,
}

impl MessageAggregate {
    /// Derive an aggregate from its member attempts.
    ///
    /// Duplicated ids are collapsed to their first occurrence. Returns `None`
    /// when there is nothing to aggregate.
    pub fn from_attempts(
        message_id: impl Into<String>,
        attempts: Vec<DeliveryAttempt>,
        document_id: Option<String>,
        parsing_error: Option<String>,
    ) -> Option<Self> {
        let mut seen = HashSet::with_capacity(attempts.len());
        let mut attempts: Vec<DeliveryAttempt> = attempts
            .into_iter()
            .filter(|a| seen.insert(a.id.clone()))
            .collect();
        attempts.sort_by(chronological);

        let oldest_attempt = attempts.first()?.created_at;
        let newest_attempt = attempts.last()?.created_at;
        let attempt_count = attempts.len();
        let successes = attempts.iter().filter(|a| !a.is_failure).count();
        let success_rate = 100.0 * successes as f64 / attempt_count as f64;
        let latest_failure = attempts.iter().rev().find(|a| a.is_failure).cloned();
        let large_payload_failure = latest_failure
            .as_ref()
            .is_some_and(is_large_payload_failure);

        Some(Self {
            message_id: message_id.into(),
            attempts,
            oldest_attempt,
            newest_attempt,
            attempt_count,
            success_rate,
            latest_failure,
            document_id,
            parsing_error,
            large_payload_failure,
        })
    }

    pub fn contains_attempt(&self, attempt_id: &str) -> bool {
        self.attempts.iter().any(|a| a.id == attempt_id)
    }

    pub fn is_fully_successful(&self) -> bool {
        self.success_rate >= 100.0
    }

    pub fn is_fully_failed(&self) -> bool {
        self.success_rate <= 0.0
    }
}

/// Whether a failed attempt looks like an oversized-payload rejection.
///
/// Matches an exact 413 result code, or any marker in the failure reason or
/// response body regardless of case.
pub fn is_large_payload_failure(attempt: &DeliveryAttempt) -> bool {
    if attempt.result_code == Some(PAYLOAD_TOO_LARGE) {
        return true;
    }

    [attempt.failure_reason.as_deref(), attempt.result_body.as_deref()]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .any(|text| LARGE_PAYLOAD_MARKERS.iter().any(|m| text.contains(m)))
}

fn chronological(a: &DeliveryAttempt, b: &DeliveryAttempt) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn newest_first(a: &MessageAggregate, b: &MessageAggregate) -> Ordering {
    b.newest_attempt
        .cmp(&a.newest_attempt)
        .then_with(|| a.message_id.cmp(&b.message_id))
}

/// How a batch relates to the aggregates already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Full load: the batch replaces everything held so far.
    Replace,
    /// Later data: fold the batch into the existing aggregates.
    Incremental,
}

/// Fold `new_attempts` into `existing` and return the updated collection,
/// ordered newest first.
///
/// Attempts with an empty `message_id` cannot be attributed and are dropped.
/// In [`MergeMode::Incremental`], attempts whose id an existing aggregate
/// already holds are ignored, so re-merging a batch is a no-op.
pub fn merge(
    existing: Vec<MessageAggregate>,
    new_attempts: &[DeliveryAttempt],
    document_ids: &DocumentIdMap,
    parsing_errors: &[DecodeFailure],
    mode: MergeMode,
) -> Vec<MessageAggregate> {
    let errors: HashMap<&str, &str> = parsing_errors
        .iter()
        .map(|f| (f.id.as_str(), f.error.as_str()))
        .collect();
    let groups = group_by_message(new_attempts);

    let mut merged = match mode {
        MergeMode::Replace => groups
            .into_iter()
            .filter_map(|(message_id, attempts)| {
                let (document_id, parsing_error) =
                    decode_outcome(message_id, document_ids, &errors, None);
                MessageAggregate::from_attempts(message_id, attempts, document_id, parsing_error)
            })
            .collect(),
        MergeMode::Incremental => {
            let mut merged = existing;
            let mut index: HashMap<String, usize> = merged
                .iter()
                .enumerate()
                .map(|(i, agg)| (agg.message_id.clone(), i))
                .collect();

            for (message_id, attempts) in groups {
                match index.get(message_id) {
                    Some(&i) => {
                        let current = &merged[i];
                        let fresh: Vec<DeliveryAttempt> = attempts
                            .into_iter()
                            .filter(|a| !current.contains_attempt(&a.id))
                            .collect();
                        if fresh.is_empty() {
                            continue;
                        }

                        let mut union = current.attempts.clone();
                        union.extend(fresh);
                        let (document_id, parsing_error) =
                            decode_outcome(message_id, document_ids, &errors, Some(current));

                        if let Some(updated) = MessageAggregate::from_attempts(
                            message_id,
                            union,
                            document_id,
                            parsing_error,
                        ) {
                            merged[i] = updated;
                        }
                    }
                    None => {
                        let (document_id, parsing_error) =
                            decode_outcome(message_id, document_ids, &errors, None);
                        if let Some(created) = MessageAggregate::from_attempts(
                            message_id,
                            attempts,
                            document_id,
                            parsing_error,
                        ) {
                            index.insert(created.message_id.clone(), merged.len());
                            merged.push(created);
                        }
                    }
                }
            }

            merged
        }
    };

    merged.sort_by(newest_first);
    merged
}

/// Document id and parsing error for `message_id`, falling back to what
/// `current` already carries. A resolved document id clears any parsing error.
fn decode_outcome(
    message_id: &str,
    document_ids: &DocumentIdMap,
    errors: &HashMap<&str, &str>,
    current: Option<&MessageAggregate>,
) -> (Option<String>, Option<String>) {
    let document_id = document_ids
        .get(message_id)
        .cloned()
        .or_else(|| current.and_then(|c| c.document_id.clone()));
    if document_id.is_some() {
        return (document_id, None);
    }

    let parsing_error = errors
        .get(message_id)
        .map(|e| e.to_string())
        .or_else(|| current.and_then(|c| c.parsing_error.clone()));
    (None, parsing_error)
}

fn group_by_message(attempts: &[DeliveryAttempt]) -> BTreeMap<&str, Vec<DeliveryAttempt>> {
    let mut groups: BTreeMap<&str, Vec<DeliveryAttempt>> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| !a.message_id.is_empty()) {
        groups
            .entry(attempt.message_id.as_str())
            .or_default()
            .push(attempt.clone());
    }
    groups
}

/// An exclusively owned aggregate collection, kept newest first.
///
/// Callers serialize access; the type has no interior mutability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSet {
    aggregates: Vec<MessageAggregate>,
}

impl AggregateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply [`merge`] to the held aggregates.
    pub fn merge(
        &mut self,
        new_attempts: &[DeliveryAttempt],
        document_ids: &DocumentIdMap,
        parsing_errors: &[DecodeFailure],
        mode: MergeMode,
    ) {
        let existing = std::mem::take(&mut self.aggregates);
        self.aggregates = merge(existing, new_attempts, document_ids, parsing_errors, mode);
    }

    pub fn as_slice(&self) -> &[MessageAggregate] {
        &self.aggregates
    }

    pub fn get(&self, message_id: &str) -> Option<&MessageAggregate> {
        self.aggregates.iter().find(|a| a.message_id == message_id)
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }

    /// Total attempts across all aggregates.
    pub fn attempt_count(&self) -> usize {
        self.aggregates.iter().map(|a| a.attempt_count).sum()
    }

    /// Every member attempt, newest message first.
    pub fn attempts(&self) -> impl Iterator<Item = &DeliveryAttempt> {
        self.aggregates.iter().flat_map(|a| a.attempts.iter())
    }
}
