use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::DashboardSnapshot;
use super::error::SnapshotError;
use super::traits::SnapshotStore;

/// Snapshot store keeping one JSON file per key.
///
/// Writes go to `{base_path}/.tmp` first and are renamed into place, so a
/// reader never observes a partially written snapshot.
pub struct FilesystemSnapshotStore {
    base_path: PathBuf,
}

impl FilesystemSnapshotStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, SnapshotError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn snapshot_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{file_name}.json"))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl SnapshotStore for FilesystemSnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<DashboardSnapshot>, SnapshotError> {
        match fs::read(self.snapshot_path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, snapshot: &DashboardSnapshot) -> Result<(), SnapshotError> {
        let data = serde_json::to_vec(snapshot)?;
        let temp_path = self.temp_path();

        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, self.snapshot_path(key)).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<bool, SnapshotError> {
        match fs::remove_file(self.snapshot_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
