use crate::e2e::helpers::{
    audio_archive, fast_settings, file_names, write_inputs, MockSpeechService, RESOURCE_KEY,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use voice_batch::domain::synthesis::{
    BatchCoordinator, InputUnit, PipelineSettings, ResultDownloader, RunReport,
};
use voice_batch::infrastructure::repositories::{AzureBatchRepository, BatchSynthesisRepository};
use voice_batch::infrastructure::storage::ArtifactStore;

const OUTPUT_FORMAT: &str = "audio-48khz-192kbitrate-mono-mp3";

async fn run_batch(
    service: &MockSpeechService,
    sources: &[std::path::PathBuf],
    output: &Path,
    settings: PipelineSettings,
) -> RunReport {
    let repo: Arc<dyn BatchSynthesisRepository> = Arc::new(AzureBatchRepository::new(
        reqwest::Client::new(),
        service.batch_url(),
        RESOURCE_KEY.to_string(),
        OUTPUT_FORMAT.to_string(),
    ));
    let store = ArtifactStore::new(output, &settings.archive_entry_extension);
    let downloader = Arc::new(ResultDownloader::new(Arc::clone(&repo), store));
    let coordinator = BatchCoordinator::new(repo, downloader, settings);

    let mut units = Vec::new();
    for source in sources {
        units.push(InputUnit::from_file(source).await.unwrap());
    }

    coordinator
        .run(units, Arc::new(json!({ "voice": "en-US-JennyNeural" })))
        .await
}

#[tokio::test]
async fn it_should_download_every_job_that_succeeds() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(
        input.path(),
        &[("ch01.txt", "Chapter one."), ("ch02.txt", "Chapter two.")],
    );

    service.happy_job(&sources[0], "job-1", b"audio one").await;
    service.happy_job(&sources[1], "job-2", b"audio two").await;

    let report = run_batch(&service, &sources, output.path(), fast_settings()).await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.downloads_succeeded, 2);
    assert!(report.poll_cycles >= 2);
    assert_eq!(
        file_names(output.path()),
        vec!["ch01_voice_synthesis.mp3", "ch02_voice_synthesis.mp3"]
    );
    assert_eq!(
        std::fs::read(output.path().join("ch02_voice_synthesis.mp3")).unwrap(),
        b"audio two"
    );
}

#[tokio::test]
async fn it_should_keep_going_when_one_submission_is_rejected() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(
        input.path(),
        &[("a.txt", "First."), ("b.txt", "Second."), ("c.txt", "Third.")],
    );

    service.happy_job(&sources[0], "job-a", b"a").await;
    service
        .reject_submission(&sources[1], 400, "Invalid synthesis config")
        .await;
    service.happy_job(&sources[2], "job-c", b"c").await;

    let report = run_batch(&service, &sources, output.path(), fast_settings()).await;

    assert_eq!(report.inputs, 3);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.submission_failures.len(), 1);
    assert!(report.submission_failures[0].subject.ends_with("b.txt"));
    assert!(report.submission_failures[0].message.contains("400"));
    assert_eq!(report.downloads_succeeded, 2);
    assert!(!report.is_success());
    assert!(report.to_string().contains("Submissions: 2 succeeded, 1 failed (of 3 inputs)"));
    assert_eq!(
        file_names(output.path()),
        vec!["a_voice_synthesis.mp3", "c_voice_synthesis.mp3"]
    );
}

#[tokio::test]
async fn it_should_report_failed_jobs_without_downloading_them() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(input.path(), &[("ok.txt", "Fine."), ("bad.txt", "Broken.")]);

    service.happy_job(&sources[0], "job-ok", b"ok").await;
    service.accept_submission(&sources[1], "job-bad").await;
    service
        .job_failed("job-bad", &sources[1], "Unsupported voice")
        .await;

    let report = run_batch(&service, &sources, output.path(), fast_settings()).await;

    assert_eq!(report.submitted, 2);
    assert_eq!(report.job_failures.len(), 1);
    assert!(report.job_failures[0].subject.contains("job-bad"));
    assert_eq!(report.job_failures[0].message, "job failed: Unsupported voice");
    assert_eq!(report.downloads_succeeded, 1);
    assert!(!report.is_success());
    assert_eq!(file_names(output.path()), vec!["ok_voice_synthesis.mp3"]);
}

#[tokio::test]
async fn it_should_retry_polls_after_transient_errors() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(input.path(), &[("flaky.txt", "Hello.")]);

    service.accept_submission(&sources[0], "job-flaky").await;
    service.job_status_error("job-flaky", 503, 2).await;
    service.job_succeeded("job-flaky", &sources[0]).await;
    service
        .artifact("job-flaky", audio_archive(b"hello"), None)
        .await;

    let report = run_batch(&service, &sources, output.path(), fast_settings()).await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.poll_cycles, 3);
    assert_eq!(file_names(output.path()), vec!["flaky_voice_synthesis.mp3"]);
}

#[tokio::test]
async fn it_should_isolate_a_corrupt_archive() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(input.path(), &[("good.txt", "Good."), ("torn.txt", "Torn.")]);

    service.happy_job(&sources[0], "job-good", b"good").await;
    service.accept_submission(&sources[1], "job-torn").await;
    service.job_succeeded("job-torn", &sources[1]).await;
    service
        .artifact("job-torn", b"definitely not a zip".to_vec(), None)
        .await;

    let report = run_batch(&service, &sources, output.path(), fast_settings()).await;

    assert_eq!(report.downloads_succeeded, 1);
    assert_eq!(report.download_failures.len(), 1);
    assert_eq!(report.download_failures[0].subject, "job-torn");
    assert!(!report.is_success());
    assert_eq!(file_names(output.path()), vec!["good_voice_synthesis.mp3"]);
}

#[tokio::test]
async fn it_should_stop_waiting_when_downloads_time_out() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(
        input.path(),
        &[
            ("p1.txt", "One."),
            ("p2.txt", "Two."),
            ("p3.txt", "Three."),
            ("p4.txt", "Four."),
            ("p5.txt", "Five."),
        ],
    );

    for (i, source) in sources.iter().enumerate().take(4) {
        service
            .happy_job(source, &format!("job-{}", i + 1), b"audio")
            .await;
    }
    service.accept_submission(&sources[4], "job-5").await;
    service.job_succeeded("job-5", &sources[4]).await;
    service
        .artifact("job-5", audio_archive(b"late"), Some(Duration::from_secs(5)))
        .await;

    let settings = PipelineSettings {
        download_timeout: Duration::from_millis(1500),
        ..fast_settings()
    };
    let report = run_batch(&service, &sources, output.path(), settings).await;

    assert!(report.timed_out());
    assert_eq!(report.downloads_pending, 1);
    assert_eq!(report.downloads_succeeded, 4);
    assert!(!report.is_success());
    assert!(report
        .to_string()
        .contains("Download phase timed out with 1 item(s) unresolved"));
    assert_eq!(file_names(output.path()).len(), 4);
    assert!(!output.path().join("p5_voice_synthesis.mp3").exists());
}

#[tokio::test]
async fn it_should_leave_jobs_unresolved_when_polling_times_out() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(input.path(), &[("slow.txt", "Slow.")]);

    service.accept_submission(&sources[0], "job-slow").await;
    service
        .job_status_times("job-slow", &sources[0], "Running", 10_000)
        .await;

    let settings = PipelineSettings {
        poll_timeout: Some(Duration::from_millis(200)),
        ..fast_settings()
    };
    let report = run_batch(&service, &sources, output.path(), settings).await;

    assert_eq!(report.unresolved_jobs.len(), 1);
    assert_eq!(report.downloads_succeeded, 0);
    assert!(!report.is_success());
    assert!(file_names(output.path()).is_empty());
}

#[tokio::test]
async fn it_should_refuse_inputs_that_would_share_an_output_name() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    std::fs::create_dir(input.path().join("part1")).unwrap();
    std::fs::create_dir(input.path().join("part2")).unwrap();
    let first = write_inputs(&input.path().join("part1"), &[("ch01.txt", "First.")]);
    let second = write_inputs(&input.path().join("part2"), &[("ch01.txt", "Second.")]);
    let sources = vec![first[0].clone(), second[0].clone()];

    service.happy_job(&sources[0], "job-first", b"first").await;

    let report = run_batch(&service, &sources, output.path(), fast_settings()).await;

    assert_eq!(report.submitted, 1);
    assert_eq!(report.submission_failures.len(), 1);
    assert_eq!(
        report.submission_failures[0].subject,
        sources[1].display().to_string()
    );
    assert_eq!(report.downloads_succeeded, 1);
    assert!(!report.is_success());
    assert_eq!(
        std::fs::read(output.path().join("ch01_voice_synthesis.mp3")).unwrap(),
        b"first"
    );
}
