use std::sync::Arc;

use super::error::SynthesisError;
use super::model::{DownloadOutcome, Job, JobState};
use crate::infrastructure::repositories::BatchSynthesisRepository;
use crate::infrastructure::storage::ArtifactStore;

/// Fetches finished artifacts and stores them under the output convention
pub struct ResultDownloader {
    repo: Arc<dyn BatchSynthesisRepository>,
    store: ArtifactStore,
}

impl ResultDownloader {
    pub fn new(repo: Arc<dyn BatchSynthesisRepository>, store: ArtifactStore) -> Self {
        Self { repo, store }
    }

    /// Download one succeeded job. Never fails past the job boundary.
    pub async fn download(&self, job: &Job) -> DownloadOutcome {
        let job_id = job.id.clone();
        match self.try_download(job).await {
            Ok(paths) => {
                tracing::info!(
                    job_id = %job_id,
                    files = ?paths,
                    "Artifact downloaded"
                );
                DownloadOutcome::Saved { job_id, paths }
            }
            Err(error) => {
                tracing::error!(job_id = %job_id, error = %error, "Download failed");
                DownloadOutcome::Failed { job_id, error }
            }
        }
    }

    async fn try_download(&self, job: &Job) -> Result<Vec<std::path::PathBuf>, SynthesisError> {
        let uri = match (job.state(), job.result_uri.as_deref()) {
            (JobState::Succeeded, Some(uri)) => uri,
            (state, _) => {
                return Err(SynthesisError::Download {
                    status: None,
                    message: format!("job {} is {} without a result location", job.id, state),
                })
            }
        };

        tracing::info!(
            job_id = %job.id,
            uri = uri,
            output_dir = %self.store.output_dir().display(),
            "Downloading artifact"
        );

        let bytes = self
            .repo
            .fetch(uri)
            .await
            .map_err(SynthesisError::download)?;

        self.store.save(&job.unit.basename(), uri, bytes).await
    }
}
