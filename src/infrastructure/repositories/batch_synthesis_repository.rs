use crate::domain::synthesis::{InputUnit, JobId, PollResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Failure talking to the remote speech service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status, absent for transport failures
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Repository for asynchronous batch synthesis jobs.
///
/// Every call is a single request: no retries happen here. Implementations
/// hold only read-only state so one instance can serve concurrent
/// submissions and downloads.
#[async_trait]
pub trait BatchSynthesisRepository: Send + Sync {
    /// Submit one input as a batch synthesis job
    ///
    /// The voice configuration is forwarded verbatim.
    async fn submit(&self, unit: &InputUnit, voice_config: &Value) -> Result<JobId, RemoteError>;

    /// Query the current status of a job
    ///
    /// Transient failures are reported as an `Unknown` state rather than an
    /// error so the poller can retry on the next cycle.
    async fn poll(&self, job_id: &JobId) -> PollResponse;

    /// Fetch a finished artifact
    async fn fetch(&self, result_uri: &str) -> Result<Vec<u8>, RemoteError>;

    /// List the jobs known to the service
    async fn list_jobs(&self) -> Result<Value, RemoteError>;
}
