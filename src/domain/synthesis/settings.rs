use std::time::Duration;

use super::chunker::DEFAULT_CHUNK_SIZE;

/// Default delay between whole poll cycles
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default delay between two polls inside one cycle
pub const DEFAULT_POLL_THROTTLE: Duration = Duration::from_secs(1);

/// Default overall wait for the download phase
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(900);

pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;
pub const DEFAULT_REALTIME_CONCURRENCY: usize = 4;

/// Tunables for the batch and realtime pipelines
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub submit_concurrency: usize,
    pub download_concurrency: usize,
    pub realtime_concurrency: usize,
    pub poll_interval: Duration,
    pub poll_throttle: Duration,
    /// No limit when unset
    pub poll_timeout: Option<Duration>,
    pub download_timeout: Duration,
    pub chunk_size: usize,
    /// Extension of archive entries kept after extraction
    pub archive_entry_extension: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            submit_concurrency: default_submit_concurrency(),
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            realtime_concurrency: DEFAULT_REALTIME_CONCURRENCY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_throttle: DEFAULT_POLL_THROTTLE,
            poll_timeout: None,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            archive_entry_extension: "mp3".to_string(),
        }
    }
}

/// One submission worker per available CPU
pub fn default_submit_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
