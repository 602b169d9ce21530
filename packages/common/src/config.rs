use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Largest page the upstream API serves.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Upstream pagination and time-window settings.
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Records per page. Clamped to 1..=50. Default: 50.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pages issued per fetch call. Default: 5.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Page requests in flight at once. Default: 5.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// How far back a single fetch looks, in hours. Default: 24.
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}
fn default_max_pages() -> u32 {
    5
}
fn default_parallelism() -> usize {
    5
}
fn default_window_hours() -> i64 {
    24
}

impl FetchConfig {
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.max(1)
    }

    pub fn window_span(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_hours.max(1))
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            parallelism: default_parallelism(),
            window_hours: default_window_hours(),
        }
    }
}

/// Chunk sizes used when replaying a fetched batch through the merge.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    /// Size of the first chunk. Default: 100.
    #[serde(default = "default_initial_chunk")]
    pub initial_chunk: usize,
    /// Upper bound for later chunks, which double in size. Default: 1000.
    #[serde(default = "default_max_chunk")]
    pub max_chunk: usize,
}

fn default_initial_chunk() -> usize {
    100
}
fn default_max_chunk() -> usize {
    1000
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            initial_chunk: default_initial_chunk(),
            max_chunk: default_max_chunk(),
        }
    }
}

/// Dashboard snapshot cache settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether snapshots are written and restored. Default: true.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Directory holding snapshot files. Default: "./.hookwatch-cache".
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Age after which a snapshot is no longer restored. Default: 300 (5 minutes).
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.hookwatch-cache")
}
fn default_cache_ttl_secs() -> u64 {
    300
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}
