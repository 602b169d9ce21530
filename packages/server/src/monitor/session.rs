use chrono::{DateTime, Utc};
use common::projection::{ViewPage, ViewQuery, project};
use common::replay;
use common::snapshot::DashboardSnapshot;
use common::{
    AggregateSet, DecodeFailure, DecodeReport, DeliveryAttempt, DocumentIdMap, MergeMode,
    ReplayConfig, TimeWindow,
};

/// Identifies the webhook a session monitors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub project_id: String,
    pub webhook_id: String,
}

impl SessionKey {
    pub fn new(project_id: impl Into<String>, webhook_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            webhook_id: webhook_id.into(),
        }
    }
}

/// Totals over every aggregate a session holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub messages: usize,
    pub attempts: usize,
    pub messages_with_failures: usize,
    pub large_payload_failures: usize,
}

/// Monitoring state for one webhook.
///
/// The session exclusively owns its aggregate collection. Callers hold the
/// session lock for the whole of a fetch-and-merge cycle, so merges for one
/// webhook never interleave.
#[derive(Debug)]
pub struct MonitorSession {
    key: SessionKey,
    aggregates: AggregateSet,
    document_ids: DocumentIdMap,
    decode_failures: Vec<DecodeFailure>,
    window: Option<TimeWindow>,
    has_more_data: bool,
    from_cache: bool,
    last_updated: Option<DateTime<Utc>>,
}

impl MonitorSession {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            aggregates: AggregateSet::new(),
            document_ids: DocumentIdMap::new(),
            decode_failures: Vec::new(),
            window: None,
            has_more_data: false,
            from_cache: false,
            last_updated: None,
        }
    }

    /// Rebuild a session from a persisted snapshot.
    pub fn from_snapshot(key: SessionKey, snapshot: DashboardSnapshot, config: &ReplayConfig) -> Self {
        let mut session = Self::new(key);
        session.document_ids = snapshot.document_ids;
        session.decode_failures = snapshot.messages_with_errors;
        replay::replay(
            &mut session.aggregates,
            &snapshot.attempts,
            &session.document_ids,
            &session.decode_failures,
            MergeMode::Replace,
            config,
        );
        session.has_more_data = snapshot.has_more_data;
        session.from_cache = true;
        session.last_updated = Some(snapshot.timestamp);
        session
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn aggregates(&self) -> &AggregateSet {
        &self.aggregates
    }

    pub fn decode_failures(&self) -> &[DecodeFailure] {
        &self.decode_failures
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.window
    }

    pub fn has_more_data(&self) -> bool {
        self.has_more_data
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Start of the oldest data loaded so far, used to anchor "load older".
    pub fn oldest_loaded(&self) -> Option<DateTime<Utc>> {
        self.window.map(|w| w.start).or_else(|| {
            self.aggregates
                .as_slice()
                .iter()
                .map(|a| a.oldest_attempt)
                .min()
        })
    }

    /// Replace decode results wholesale, as on a full refresh.
    pub fn reset_decoded(&mut self, report: DecodeReport) {
        self.document_ids = report.document_ids;
        self.decode_failures = report.failures;
    }

    /// Add decode results, keeping one failure per message.
    ///
    /// A message that now has a document id no longer counts as failed.
    pub fn absorb_decoded(&mut self, report: DecodeReport) {
        self.document_ids.extend(report.document_ids);
        for failure in report.failures {
            if !self.decode_failures.iter().any(|f| f.id == failure.id) {
                self.decode_failures.push(failure);
            }
        }
        let document_ids = &self.document_ids;
        self.decode_failures
            .retain(|f| !document_ids.contains_key(&f.id));
    }

    /// Replay `attempts` through the merge in growing chunks, yielding to the
    /// scheduler between chunks.
    pub async fn apply(
        &mut self,
        attempts: &[DeliveryAttempt],
        mode: MergeMode,
        config: &ReplayConfig,
    ) -> usize {
        if attempts.is_empty() {
            return replay::replay(
                &mut self.aggregates,
                attempts,
                &self.document_ids,
                &self.decode_failures,
                mode,
                config,
            );
        }

        let mut merged = 0;
        for (index, chunk) in replay::chunks(attempts, config).enumerate() {
            replay::merge_chunk(
                &mut self.aggregates,
                index,
                chunk,
                &self.document_ids,
                &self.decode_failures,
                mode,
            );
            merged += 1;
            tokio::task::yield_now().await;
        }
        merged
    }

    /// Record the outcome of a completed fetch cycle.
    pub fn finish_cycle(&mut self, window: TimeWindow, has_more_data: bool, replaced: bool) {
        self.window = match (self.window, replaced) {
            (Some(current), false) => Some(current.union(&window)),
            _ => Some(window),
        };
        self.has_more_data = has_more_data;
        self.from_cache = false;
        self.last_updated = Some(Utc::now());
    }

    pub fn view(&self, query: &ViewQuery) -> ViewPage<'_> {
        project(self.aggregates.as_slice(), query)
    }

    pub fn summary(&self) -> SessionSummary {
        let aggregates = self.aggregates.as_slice();
        SessionSummary {
            messages: aggregates.len(),
            attempts: self.aggregates.attempt_count(),
            messages_with_failures: aggregates
                .iter()
                .filter(|a| !a.is_fully_successful())
                .count(),
            large_payload_failures: aggregates
                .iter()
                .filter(|a| a.large_payload_failure)
                .count(),
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            attempts: self.aggregates.attempts().cloned().collect(),
            document_ids: self.document_ids.clone(),
            messages_with_errors: self.decode_failures.clone(),
            timestamp: self.last_updated.unwrap_or_else(Utc::now),
            has_more_data: self.has_more_data,
        }
    }
}
