use std::collections::BTreeMap;

use super::model::{Job, JobId, JobState};

/// Jobs of one run, keyed by the identifier the service assigned
///
/// Owned by the coordinator; the set is frozen once submissions drain.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: BTreeMap<JobId, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly submitted job. Returns false for a duplicate id.
    pub fn insert(&mut self, job: Job) -> bool {
        if self.jobs.contains_key(&job.id) {
            tracing::warn!(job_id = %job.id, "Service returned a duplicate job id");
            return false;
        }
        self.jobs.insert(job.id.clone(), job);
        true
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Jobs that still need polling
    pub fn pending_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut().filter(|job| !job.is_terminal())
    }

    pub fn pending_count(&self) -> usize {
        self.jobs.values().filter(|job| !job.is_terminal()).count()
    }

    pub fn count_in(&self, state: JobState) -> usize {
        self.jobs.values().filter(|job| job.state() == state).count()
    }

    pub fn into_jobs(self) -> impl Iterator<Item = Job> {
        self.jobs.into_values()
    }
}
