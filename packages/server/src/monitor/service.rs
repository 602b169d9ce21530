use std::sync::Arc;

use chrono::Utc;
use common::snapshot::{SnapshotStore, snapshot_key};
use common::{Message, MergeMode, decode_documents};
use tracing::{info, instrument, warn};
use upstream::{FetchError, FetchOutcome, FetchRequest, UpstreamClient};

use crate::config::AppConfig;

use super::session::{MonitorSession, SessionKey};

/// Drives fetch-decode-merge cycles for monitoring sessions.
pub struct MonitorService<'a> {
    upstream: &'a UpstreamClient,
    config: &'a AppConfig,
    snapshots: Option<&'a Arc<dyn SnapshotStore>>,
}

impl<'a> MonitorService<'a> {
    pub fn new(
        upstream: &'a UpstreamClient,
        config: &'a AppConfig,
        snapshots: Option<&'a Arc<dyn SnapshotStore>>,
    ) -> Self {
        Self {
            upstream,
            config,
            snapshots,
        }
    }

    /// Reload the most recent window from scratch.
    #[instrument(skip_all, fields(project_id = %session.key().project_id, webhook_id = %session.key().webhook_id))]
    pub async fn refresh(&self, session: &mut MonitorSession) -> Result<(), FetchError> {
        let key = session.key().clone();
        let request = FetchRequest::new(
            &key.project_id,
            &key.webhook_id,
            None,
            &self.config.fetch,
        );

        let (attempts, messages) = self.fetch_both(&request).await?;

        session.reset_decoded(decode_documents(&messages));
        let chunks = session
            .apply(&attempts.records, MergeMode::Replace, &self.config.replay)
            .await;
        session.finish_cycle(attempts.window, attempts.older_data_available(), true);

        info!(
            attempts = attempts.records.len(),
            messages = messages.len(),
            aggregates = session.aggregates().len(),
            chunks,
            "Dashboard refreshed"
        );

        self.persist(session).await;
        Ok(())
    }

    /// Fetch the window preceding the oldest loaded data and fold it in.
    ///
    /// A session with nothing loaded yet is refreshed instead.
    #[instrument(skip_all, fields(project_id = %session.key().project_id, webhook_id = %session.key().webhook_id))]
    pub async fn load_older(&self, session: &mut MonitorSession) -> Result<(), FetchError> {
        let Some(before) = session.oldest_loaded() else {
            return self.refresh(session).await;
        };

        let key = session.key().clone();
        let request = FetchRequest::new(
            &key.project_id,
            &key.webhook_id,
            Some(before),
            &self.config.fetch,
        );

        let (attempts, messages) = self.fetch_both(&request).await?;

        session.absorb_decoded(decode_documents(&messages));
        let before_count = session.aggregates().attempt_count();
        session
            .apply(&attempts.records, MergeMode::Incremental, &self.config.replay)
            .await;
        session.finish_cycle(attempts.window, attempts.older_data_available(), false);

        info!(
            fetched = attempts.records.len(),
            new_attempts = session.aggregates().attempt_count().saturating_sub(before_count),
            aggregates = session.aggregates().len(),
            "Loaded older data"
        );

        self.persist(session).await;
        Ok(())
    }

    /// Rebuild a session from a fresh snapshot, if one exists.
    pub async fn restore(&self, key: &SessionKey) -> Option<MonitorSession> {
        let store = self.snapshots?;
        let snapshot = match store
            .load(&snapshot_key(&key.project_id, &key.webhook_id))
            .await
        {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read dashboard snapshot");
                return None;
            }
        };

        if !snapshot.is_fresh(Utc::now(), self.config.cache.ttl()) {
            return None;
        }

        info!(
            project_id = %key.project_id,
            webhook_id = %key.webhook_id,
            attempts = snapshot.attempts.len(),
            "Restored dashboard from snapshot"
        );
        Some(MonitorSession::from_snapshot(
            key.clone(),
            snapshot,
            &self.config.replay,
        ))
    }

    /// Fetch attempts and messages for the same window concurrently.
    ///
    /// Only a failure of the attempts fetch is fatal; without messages the
    /// aggregates simply lack document ids.
    async fn fetch_both(
        &self,
        request: &FetchRequest,
    ) -> Result<(FetchOutcome<common::DeliveryAttempt>, Vec<Message>), FetchError> {
        let (attempts, messages) = tokio::join!(
            self.upstream.fetch_attempts(request),
            self.upstream.fetch_messages(request),
        );
        let attempts = attempts?;

        let messages = match messages {
            Ok(outcome) => outcome.records,
            Err(e @ FetchError::UpstreamUnavailable { .. }) => {
                warn!(error = %e, "Messages unavailable, continuing without document ids");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok((attempts, messages))
    }

    async fn persist(&self, session: &MonitorSession) {
        let Some(store) = self.snapshots else {
            return;
        };
        let key = session.key();
        if let Err(e) = store
            .save(
                &snapshot_key(&key.project_id, &key.webhook_id),
                &session.snapshot(),
            )
            .await
        {
            warn!(error = %e, "Failed to write dashboard snapshot");
        }
    }
}
