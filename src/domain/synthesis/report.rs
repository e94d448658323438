use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// One failed item, kept for the final report
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    /// Source path or job id the failure belongs to
    pub subject: String,
    pub message: String,
}

impl ItemFailure {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Aggregate result of a batch run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub inputs: usize,
    pub submitted: usize,
    pub submission_failures: Vec<ItemFailure>,
    pub job_failures: Vec<ItemFailure>,
    /// Jobs still not terminal when polling gave up
    pub unresolved_jobs: Vec<ItemFailure>,
    pub poll_cycles: u32,
    pub downloads_succeeded: usize,
    pub download_failures: Vec<ItemFailure>,
    /// Downloads not finished when the download timeout fired
    pub downloads_pending: usize,
    pub saved: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(run_id: Uuid, inputs: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            inputs,
            submitted: 0,
            submission_failures: Vec::new(),
            job_failures: Vec::new(),
            unresolved_jobs: Vec::new(),
            poll_cycles: 0,
            downloads_succeeded: 0,
            download_failures: Vec::new(),
            downloads_pending: 0,
            saved: Vec::new(),
        }
    }

    pub fn timed_out(&self) -> bool {
        self.downloads_pending > 0
    }

    /// Items that did not reach a written artifact
    pub fn unresolved_count(&self) -> usize {
        self.submission_failures.len()
            + self.job_failures.len()
            + self.unresolved_jobs.len()
            + self.download_failures.len()
            + self.downloads_pending
    }

    /// True only when every stage completed with zero failures
    pub fn is_success(&self) -> bool {
        self.unresolved_count() == 0 && self.downloads_succeeded == self.submitted
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} started {}, took {:.1}s",
            self.run_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.elapsed.as_secs_f64()
        )?;
        writeln!(
            f,
            "Submissions: {} succeeded, {} failed (of {} inputs)",
            self.submitted,
            self.submission_failures.len(),
            self.inputs
        )?;
        writeln!(
            f,
            "Jobs: {} failed, {} unresolved after {} poll cycle(s)",
            self.job_failures.len(),
            self.unresolved_jobs.len(),
            self.poll_cycles
        )?;
        writeln!(
            f,
            "Downloads: {} succeeded, {} failed, {} still pending",
            self.downloads_succeeded,
            self.download_failures.len(),
            self.downloads_pending
        )?;

        let sections = [
            ("Failed submissions", &self.submission_failures),
            ("Failed jobs", &self.job_failures),
            ("Unresolved jobs", &self.unresolved_jobs),
            ("Failed downloads", &self.download_failures),
        ];
        for (title, failures) in sections {
            if failures.is_empty() {
                continue;
            }
            writeln!(f, "{}:", title)?;
            for failure in failures {
                writeln!(f, "  {}", failure)?;
            }
        }

        if self.timed_out() {
            writeln!(
                f,
                "Download phase timed out with {} item(s) unresolved",
                self.downloads_pending
            )?;
        }

        if self.is_success() {
            write!(
                f,
                "Successfully generated and downloaded {} voice syntheses",
                self.downloads_succeeded
            )
        } else {
            write!(f, "Run incomplete: {} item(s) unresolved", self.unresolved_count())
        }
    }
}
