use async_trait::async_trait;

use super::DashboardSnapshot;
use super::error::SnapshotError;

/// Key-value store for dashboard snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the snapshot stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<DashboardSnapshot>, SnapshotError>;

    /// Replace the snapshot stored under `key`.
    async fn save(&self, key: &str, snapshot: &DashboardSnapshot) -> Result<(), SnapshotError>;

    /// Remove the snapshot stored under `key`.
    ///
    /// Returns `true` if a snapshot was removed, `false` if none existed.
    async fn clear(&self, key: &str) -> Result<bool, SnapshotError>;
}
