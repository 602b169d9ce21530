use std::sync::Arc;

use anyhow::Context;
use common::snapshot::SnapshotStore;
use common::snapshot::filesystem::FilesystemSnapshotStore;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use upstream::{FetchError, UpstreamClient};

use crate::config::AppConfig;
use crate::monitor::{MonitorService, MonitorSession, SessionKey};

/// Fetch cycle a dashboard request triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Refresh,
    LoadOlder,
}

/// Live monitoring sessions, one per project/webhook pair.
pub type SessionMap = DashMap<SessionKey, Arc<Mutex<MonitorSession>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub upstream: Arc<UpstreamClient>,
    pub snapshots: Option<Arc<dyn SnapshotStore>>,
    pub sessions: Arc<SessionMap>,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        if config.upstream.token().is_none() {
            warn!("No upstream token configured; fetch requests will fail");
        }
        let upstream = UpstreamClient::new(config.upstream.clone())
            .context("Failed to build upstream client")?;

        let snapshots = if config.cache.enabled {
            info!(dir = %config.cache.dir.display(), "Dashboard snapshots enabled");
            let store = FilesystemSnapshotStore::new(config.cache.dir.clone())
                .await
                .with_context(|| {
                    format!("Failed to open snapshot dir {}", config.cache.dir.display())
                })?;
            Some(Arc::new(store) as Arc<dyn SnapshotStore>)
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            upstream: Arc::new(upstream),
            snapshots,
            sessions: Arc::new(DashMap::new()),
        })
    }

    pub fn monitor(&self) -> MonitorService<'_> {
        MonitorService::new(&self.upstream, &self.config, self.snapshots.as_ref())
    }

    /// Session for `key`, created empty if absent.
    pub fn session(&self, key: &SessionKey) -> Arc<Mutex<MonitorSession>> {
        self.sessions
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(MonitorSession::new(key.clone()))))
            .clone()
    }

    pub fn existing_session(&self, key: &SessionKey) -> Option<Arc<Mutex<MonitorSession>>> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    /// Run `cycle` on the session for `key`, creating the session on demand.
    ///
    /// A session that has never completed a cycle is forgotten again when the
    /// cycle fails, so failed requests do not accumulate empty entries.
    pub async fn run_cycle(
        &self,
        key: &SessionKey,
        cycle: Cycle,
    ) -> Result<Arc<Mutex<MonitorSession>>, FetchError> {
        let session = self.session(key);
        let result = {
            let mut guard = session.lock().await;
            let monitor = self.monitor();
            let result = match cycle {
                Cycle::Refresh => monitor.refresh(&mut guard).await,
                Cycle::LoadOlder => monitor.load_older(&mut guard).await,
            };
            if result.is_err() && guard.last_updated().is_none() {
                self.sessions
                    .remove_if(key, |_, current| Arc::ptr_eq(current, &session));
            }
            result
        };
        result.map(|()| session)
    }

    /// Register a restored session unless another request got there first.
    pub fn insert_session(&self, session: MonitorSession) -> Arc<Mutex<MonitorSession>> {
        self.sessions
            .entry(session.key().clone())
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .clone()
    }
}
