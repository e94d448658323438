use std::path::PathBuf;

/// Exit code used for every run-level failure
pub const EXIT_FAILURE: i32 = 2;

/// Main application error type
///
/// Only conditions that leave no item processable end up here. Per-item
/// failures travel as outcome values and are summarized in the run report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Run incomplete: {0}")]
    Incomplete(String),
}

impl AppError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_)
            | Self::Io(_)
            | Self::InputNotFound(_)
            | Self::InvalidInput(_)
            | Self::Remote(_)
            | Self::Incomplete(_) => EXIT_FAILURE,
        }
    }

    /// Log the error and hand back the exit code
    pub fn report(&self) -> i32 {
        let code = self.exit_code();
        tracing::error!(error = %self, exit_code = code, "Run failed");
        code
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
