//! Persisted dashboard snapshots.
//!
//! The snapshot is a write-only sink refreshed after each full fetch cycle. It
//! may seed a fresh session view but is never consulted by a running merge.

mod error;
mod traits;

pub mod filesystem;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attempt::DeliveryAttempt;
use crate::decoder::{DecodeFailure, DocumentIdMap};

pub use error::SnapshotError;
pub use traits::SnapshotStore;

/// Fixed storage key; per-webhook keys append the project and webhook ids.
pub const STORAGE_KEY: &str = "webhook-monitor-cache";

/// Everything needed to rebuild a dashboard without contacting upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub attempts: Vec<DeliveryAttempt>,
    pub document_ids: DocumentIdMap,
    pub messages_with_errors: Vec<DecodeFailure>,
    pub timestamp: DateTime<Utc>,
    pub has_more_data: bool,
}

impl DashboardSnapshot {
    /// Whether the snapshot is younger than `ttl` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.timestamp <= ttl,
            Err(_) => true,
        }
    }
}

/// Storage key for one project/webhook pair.
pub fn snapshot_key(project_id: &str, webhook_id: &str) -> String {
    format!("{STORAGE_KEY}-{project_id}-{webhook_id}")
}
