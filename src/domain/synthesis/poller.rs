use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::model::{Job, JobState};
use super::registry::JobRegistry;
use crate::infrastructure::repositories::BatchSynthesisRepository;

/// How a polling run ended
#[derive(Debug, Clone, PartialEq)]
pub struct PollSummary {
    pub cycles: u32,
    pub converged: bool,
    pub elapsed: Duration,
}

/// Drives submitted jobs to a terminal state by periodic querying
///
/// One loop, one poll in flight at a time: jobs are mutated only here
/// while polling runs.
pub struct StatusPoller {
    repo: Arc<dyn BatchSynthesisRepository>,
    interval: Duration,
    throttle: Duration,
    timeout: Option<Duration>,
    verbose: bool,
}

impl StatusPoller {
    pub fn new(
        repo: Arc<dyn BatchSynthesisRepository>,
        interval: Duration,
        throttle: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            repo,
            interval,
            throttle,
            timeout,
            verbose: false,
        }
    }

    /// Log every job's state on every cycle
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Issue one poll for one job and fold the answer in
    pub async fn poll_job(&self, job: &mut Job) -> JobState {
        let response = self.repo.poll(&job.id).await;

        if let Some(source_ref) = response.source_ref.as_deref() {
            let own = job.unit.source().display().to_string();
            if source_ref != own {
                tracing::debug!(job_id = %job.id, reported = source_ref, source = %own, "Service echoed a different input reference");
            }
        }

        let previous = job.state();
        if !job.apply(response) {
            tracing::warn!(job_id = %job.id, state = %previous, "Ignored backwards job transition");
        }

        match job.state() {
            JobState::Unknown => tracing::warn!(
                job_id = %job.id,
                error = job.last_error.as_deref().unwrap_or(""),
                "Status query failed, retrying next cycle"
            ),
            JobState::Failed => tracing::error!(
                job_id = %job.id,
                source = %job.unit.source().display(),
                error = job.last_error.as_deref().unwrap_or(""),
                "Batch synthesis job failed"
            ),
            state if state != previous => tracing::info!(
                job_id = %job.id,
                from = %previous,
                to = %state,
                "Job state changed"
            ),
            _ => {}
        }

        job.state()
    }

    /// Poll every non-terminal job once. Returns how many remain pending.
    pub async fn run_cycle(&self, jobs: &mut JobRegistry) -> usize {
        let mut first = true;
        for job in jobs.pending_mut() {
            if !first {
                tokio::time::sleep(self.throttle).await;
            }
            first = false;

            let state = self.poll_job(job).await;
            if self.verbose {
                tracing::debug!(job_id = %job.id, state = %state, "Job status");
            }
        }
        jobs.pending_count()
    }

    /// Poll until every job is terminal or the timeout passes
    pub async fn run_to_convergence(&self, jobs: &mut JobRegistry) -> PollSummary {
        let started = Instant::now();
        let deadline = self.timeout.map(|t| started + t);
        let mut cycles = 0;

        loop {
            if jobs.pending_count() == 0 {
                break;
            }

            let cycle_started = Instant::now();
            let remaining = self.run_cycle(jobs).await;
            cycles += 1;

            tracing::info!(
                cycle = cycles,
                cycle_ms = cycle_started.elapsed().as_millis() as u64,
                pending = remaining,
                succeeded = jobs.count_in(JobState::Succeeded),
                failed = jobs.count_in(JobState::Failed),
                "Poll cycle finished"
            );

            if remaining == 0 {
                break;
            }

            let mut pause = self.interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    tracing::warn!(pending = remaining, "Polling timed out");
                    break;
                }
                pause = pause.min(deadline - now);
            }
            tokio::time::sleep(pause).await;
        }

        PollSummary {
            cycles,
            converged: jobs.pending_count() == 0,
            elapsed: started.elapsed(),
        }
    }
}
