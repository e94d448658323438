pub mod chunker;
pub mod coordinator;
pub mod downloader;
pub mod error;
pub mod model;
pub mod poller;
pub mod realtime;
pub mod registry;
pub mod report;
pub mod settings;

pub use chunker::split_into_chunks;
pub use coordinator::{submit_unit, BatchCoordinator};
pub use downloader::ResultDownloader;
pub use error::SynthesisError;
pub use model::{DownloadOutcome, InputUnit, Job, JobId, JobState, PollResponse, SubmissionOutcome};
pub use poller::{PollSummary, StatusPoller};
pub use realtime::{RealtimeOutcome, RealtimeReport, RealtimeSynthesizer};
pub use registry::JobRegistry;
pub use report::{ItemFailure, RunReport};
pub use settings::PipelineSettings;
