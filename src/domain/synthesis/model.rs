use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::SynthesisError;
use super::report::ItemFailure;

/// Identifier the remote service assigns to a batch synthesis job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One file (batch mode) or one text chunk (realtime mode)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputUnit {
    source: PathBuf,
    text: String,
    index: usize,
}

impl InputUnit {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>, index: usize) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            index,
        }
    }

    /// Read a whole file as a single unit
    pub async fn from_file(path: &Path) -> std::io::Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(path, text, 0))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Position of this unit within its source file
    pub fn index(&self) -> usize {
        self.index
    }

    /// Source file name without directory and extension
    pub fn basename(&self) -> String {
        source_basename(&self.source)
    }
}

pub(crate) fn source_basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Split off items whose output name an earlier item already claimed
///
/// Names are compared case-insensitively so that outputs stay distinct on
/// case-insensitive filesystems too. The first claimant keeps the name.
pub(crate) fn reject_output_collisions<T>(
    items: Vec<T>,
    source: impl Fn(&T) -> &Path,
) -> (Vec<T>, Vec<ItemFailure>) {
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut kept = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();

    for item in items {
        let path = source(&item);
        match claimed.entry(source_basename(path).to_lowercase()) {
            Entry::Occupied(first) => {
                tracing::error!(
                    source = %path.display(),
                    claimed_by = %first.get().display(),
                    "Output name already taken"
                );
                rejected.push(ItemFailure::new(
                    path.display().to_string(),
                    format!("output name already taken by {}", first.get().display()),
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                kept.push(item);
            }
        }
    }

    (kept, rejected)
}

/// Lifecycle of a submitted job
///
/// `Unknown` marks a poll that itself failed; it is retried on the next
/// cycle and never ends the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle moving forward
    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (JobState::Succeeded | JobState::Failed, _) => false,
            (_, JobState::Submitted) => false,
            _ => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Submitted => "Submitted",
            JobState::Running => "Running",
            JobState::Succeeded => "Succeeded",
            JobState::Failed => "Failed",
            JobState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one poll call learned about a job
#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse {
    pub state: JobState,
    pub result_uri: Option<String>,
    /// Input reference echoed back by the service
    pub source_ref: Option<String>,
    /// Detail for failed jobs or failed polls
    pub message: Option<String>,
}

impl PollResponse {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            state: JobState::Unknown,
            result_uri: None,
            source_ref: None,
            message: Some(message.into()),
        }
    }
}

/// One unit of remote work, owned by the coordinator
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub unit: InputUnit,
    state: JobState,
    pub result_uri: Option<String>,
    pub last_error: Option<String>,
    pub polls: u32,
}

impl Job {
    pub fn new(id: JobId, unit: InputUnit) -> Self {
        Self {
            id,
            unit,
            state: JobState::Submitted,
            result_uri: None,
            last_error: None,
            polls: 0,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Fold one poll response into the job
    ///
    /// Returns false and leaves the job untouched when the response would
    /// move the lifecycle backwards.
    pub fn apply(&mut self, response: PollResponse) -> bool {
        if !self.state.can_transition_to(response.state) {
            return false;
        }

        if response.state == JobState::Succeeded && response.result_uri.is_none() {
            self.state = JobState::Unknown;
            self.last_error = Some("service reported success without a result location".into());
            self.polls += 1;
            return true;
        }

        self.polls += 1;
        self.state = response.state;
        match response.state {
            JobState::Succeeded => {
                self.result_uri = response.result_uri;
                self.last_error = None;
            }
            JobState::Failed => {
                self.last_error = Some(
                    response
                        .message
                        .unwrap_or_else(|| "service reported job failure".to_string()),
                );
            }
            JobState::Unknown => self.last_error = response.message,
            JobState::Running | JobState::Submitted => self.last_error = None,
        }
        true
    }
}

/// Result of one submission attempt
#[derive(Debug)]
pub enum SubmissionOutcome {
    Submitted(Job),
    Rejected {
        unit: InputUnit,
        error: SynthesisError,
    },
}

impl SubmissionOutcome {
    pub fn source(&self) -> &Path {
        match self {
            SubmissionOutcome::Submitted(job) => job.unit.source(),
            SubmissionOutcome::Rejected { unit, .. } => unit.source(),
        }
    }
}

/// Result of one download attempt
#[derive(Debug)]
pub enum DownloadOutcome {
    Saved { job_id: JobId, paths: Vec<PathBuf> },
    Failed { job_id: JobId, error: SynthesisError },
}

impl DownloadOutcome {
    pub fn job_id(&self) -> &JobId {
        match self {
            DownloadOutcome::Saved { job_id, .. } | DownloadOutcome::Failed { job_id, .. } => {
                job_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Saved { .. })
    }
}
