use crate::infrastructure::repositories::RemoteError;

/// Failure of a single item in a run
///
/// These are collected into the run report rather than propagated, so
/// one bad input never costs the rest of the batch its results.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("submission failed{}: {message}", status_suffix(.status))]
    Submission { status: Option<u16>, message: String },

    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("download failed{}: {message}", status_suffix(.status))]
    Download { status: Option<u16>, message: String },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("synthesis failed{}: {message}", status_suffix(.status))]
    Synthesis { status: Option<u16>, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (code {s})")).unwrap_or_default()
}

impl SynthesisError {
    /// Remote status code attached to this failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Submission { status, .. }
            | Self::Download { status, .. }
            | Self::Synthesis { status, .. } => *status,
            _ => None,
        }
    }

    pub fn submission(err: RemoteError) -> Self {
        Self::Submission {
            status: err.status,
            message: err.message,
        }
    }

    pub fn download(err: RemoteError) -> Self {
        Self::Download {
            status: err.status,
            message: err.message,
        }
    }

    pub fn synthesis(err: RemoteError) -> Self {
        Self::Synthesis {
            status: err.status,
            message: err.message,
        }
    }
}
