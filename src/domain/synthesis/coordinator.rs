use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use super::downloader::ResultDownloader;
use super::error::SynthesisError;
use super::model::{
    reject_output_collisions, DownloadOutcome, InputUnit, Job, JobState, SubmissionOutcome,
};
use super::poller::StatusPoller;
use super::registry::JobRegistry;
use super::report::{ItemFailure, RunReport};
use super::settings::PipelineSettings;
use crate::infrastructure::repositories::BatchSynthesisRepository;

/// Submit one unit. Failures come back as a value, never as a panic or
/// an early return that would cut siblings short.
pub async fn submit_unit(
    repo: &dyn BatchSynthesisRepository,
    unit: InputUnit,
    voice_config: &Value,
) -> SubmissionOutcome {
    match repo.submit(&unit, voice_config).await {
        Ok(job_id) => {
            tracing::info!(
                job_id = %job_id,
                source = %unit.source().display(),
                "Submitted batch synthesis job"
            );
            SubmissionOutcome::Submitted(Job::new(job_id, unit))
        }
        Err(err) => {
            tracing::error!(
                source = %unit.source().display(),
                error = %err,
                "Error submitting to batch synthesis"
            );
            SubmissionOutcome::Rejected {
                unit,
                error: SynthesisError::submission(err),
            }
        }
    }
}

/// Runs the submit, poll, download pipeline for a batch of inputs
pub struct BatchCoordinator {
    repo: Arc<dyn BatchSynthesisRepository>,
    downloader: Arc<ResultDownloader>,
    settings: PipelineSettings,
    verbose: bool,
}

impl BatchCoordinator {
    pub fn new(
        repo: Arc<dyn BatchSynthesisRepository>,
        downloader: Arc<ResultDownloader>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            repo,
            downloader,
            settings,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub async fn run(&self, inputs: Vec<InputUnit>, voice_config: Arc<Value>) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("batch_run", run_id = %run_id);
        self.run_pipeline(run_id, inputs, voice_config)
            .instrument(span)
            .await
    }

    async fn run_pipeline(
        &self,
        run_id: Uuid,
        inputs: Vec<InputUnit>,
        voice_config: Arc<Value>,
    ) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(run_id, inputs.len());

        // 0. Inputs that would overwrite another input's output never go out
        let (inputs, collisions) = reject_output_collisions(inputs, InputUnit::source);
        report.submission_failures.extend(collisions);

        // 1. Submission pool, fully drained before polling starts
        let outcomes = self.submit_all(inputs, voice_config).await;

        // 2. Partition into live jobs and rejected inputs
        let mut registry = JobRegistry::new();
        for outcome in outcomes {
            match outcome {
                SubmissionOutcome::Submitted(job) => {
                    let source = job.unit.source().display().to_string();
                    if !registry.insert(job) {
                        report
                            .submission_failures
                            .push(ItemFailure::new(source, "duplicate job id returned by service"));
                    }
                }
                SubmissionOutcome::Rejected { unit, error } => {
                    report.submission_failures.push(ItemFailure::new(
                        unit.source().display().to_string(),
                        error.to_string(),
                    ));
                }
            }
        }
        report.submitted = registry.len();

        if !report.submission_failures.is_empty() {
            tracing::warn!(
                failed = report.submission_failures.len(),
                "Failed submissions detected"
            );
        }

        // 3. Poll the frozen job set to convergence
        if !registry.is_empty() {
            let poller = StatusPoller::new(
                Arc::clone(&self.repo),
                self.settings.poll_interval,
                self.settings.poll_throttle,
                self.settings.poll_timeout,
            )
            .with_verbose(self.verbose);
            let summary = poller.run_to_convergence(&mut registry).await;
            report.poll_cycles = summary.cycles;
            tracing::info!(
                cycles = summary.cycles,
                converged = summary.converged,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "Polling finished"
            );
        }

        // 4. Only succeeded jobs move on to the download pool
        let mut ready = Vec::new();
        for job in registry.into_jobs() {
            match job.state() {
                JobState::Succeeded => ready.push(job),
                JobState::Failed => {
                    let error = SynthesisError::JobFailed(
                        job.last_error
                            .unwrap_or_else(|| "no reason given".to_string()),
                    );
                    report.job_failures.push(ItemFailure::new(
                        format!("{} ({})", job.unit.source().display(), job.id),
                        error.to_string(),
                    ));
                }
                state => report.unresolved_jobs.push(ItemFailure::new(
                    format!("{} ({})", job.unit.source().display(), job.id),
                    format!("still {} when polling stopped", state),
                )),
            }
        }

        // 5. Download pool with the overall timeout
        if !ready.is_empty() {
            self.download_all(ready, &mut report).await;
        }

        report.elapsed = started.elapsed();
        report
    }

    /// Submit every unit under the submission pool bound
    pub async fn submit_all(
        &self,
        inputs: Vec<InputUnit>,
        voice_config: Arc<Value>,
    ) -> Vec<SubmissionOutcome> {
        let concurrency = self.settings.submit_concurrency.max(1);
        tracing::info!(count = inputs.len(), concurrency, "Submitting files");

        stream::iter(inputs)
            .map(|unit| {
                let repo = Arc::clone(&self.repo);
                let voice_config = Arc::clone(&voice_config);
                async move { submit_unit(repo.as_ref(), unit, &voice_config).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    async fn download_all(&self, jobs: Vec<Job>, report: &mut RunReport) {
        let limit = Arc::new(Semaphore::new(self.settings.download_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for job in jobs {
            let limit = Arc::clone(&limit);
            let downloader = Arc::clone(&self.downloader);
            tasks.spawn(async move {
                let job_id = job.id.clone();
                let _permit = match limit.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return DownloadOutcome::Failed {
                            job_id,
                            error: SynthesisError::Download {
                                status: None,
                                message: "download pool closed".to_string(),
                            },
                        }
                    }
                };
                downloader.download(&job).await
            }
            .in_current_span());
        }

        let timeout = self.settings.download_timeout;
        let collect = async {
            while let Some(joined) = tasks.join_next().await {
                record_download(report, joined);
            }
        };

        if tokio::time::timeout(timeout, collect).await.is_err() {
            abandon_unfinished(&mut tasks, report);
            tracing::error!(
                timeout_secs = timeout.as_secs_f64(),
                pending = report.downloads_pending,
                "Download phase timed out"
            );
        }
    }
}

/// Settle the download pool after its timeout
///
/// Tasks that finished but were never joined still count as done. The
/// rest are detached and counted as pending; remote jobs stay untouched.
fn abandon_unfinished(tasks: &mut JoinSet<DownloadOutcome>, report: &mut RunReport) {
    while let Some(joined) = tasks.try_join_next() {
        record_download(report, joined);
    }
    report.downloads_pending = tasks.len();
    tasks.detach_all();
}

fn record_download(
    report: &mut RunReport,
    joined: Result<DownloadOutcome, tokio::task::JoinError>,
) {
    match joined {
        Ok(DownloadOutcome::Saved { paths, .. }) => {
            report.downloads_succeeded += 1;
            report.saved.extend(paths);
        }
        Ok(DownloadOutcome::Failed { job_id, error }) => {
            report
                .download_failures
                .push(ItemFailure::new(job_id.to_string(), error.to_string()));
        }
        Err(e) => {
            tracing::error!(error = %e, "Download task panicked");
            report
                .download_failures
                .push(ItemFailure::new("download task", e.to_string()));
        }
    }
}
