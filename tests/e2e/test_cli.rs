use crate::e2e::helpers::{file_names, write_inputs, MockSpeechService, BATCH_PATH, RESOURCE_KEY};
use clap::Parser;
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;
use voice_batch::app::handle_run;
use voice_batch::cli::Cli;
use voice_batch::error::AppError;
use voice_batch::infrastructure::config::Config;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn config_for(service: &MockSpeechService) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("RESOURCE_KEY", RESOURCE_KEY.to_string()),
        ("AZURE_BASE_URL", service.uri()),
        ("POLL_INTERVAL_SECS", "0".to_string()),
        ("POLL_THROTTLE_MS", "0".to_string()),
        ("DOWNLOAD_TIMEOUT_SECS", "10".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn voice_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("voice.json");
    std::fs::write(&path, r#"{"voice": "en-GB-RyanNeural"}"#).unwrap();
    path
}

#[tokio::test]
async fn it_should_list_jobs_and_exit_cleanly() {
    let service = MockSpeechService::start().await;
    Mock::given(method("GET"))
        .and(path(BATCH_PATH))
        .and(header("Ocp-Apim-Subscription-Key", RESOURCE_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{ "id": "job-1", "status": "Succeeded" }]
        })))
        .expect(1)
        .mount(&service.server)
        .await;

    let cli = Cli::try_parse_from(["voice-batch", "--list-only"]).unwrap();
    let result = handle_run(&cli, config_for(&service)).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn it_should_fail_listing_when_the_service_refuses() {
    let service = MockSpeechService::start().await;
    Mock::given(method("GET"))
        .and(path(BATCH_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&service.server)
        .await;

    let cli = Cli::try_parse_from(["voice-batch", "--list-only"]).unwrap();
    let err = handle_run(&cli, config_for(&service)).await.unwrap_err();

    assert!(matches!(err, AppError::Remote(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn it_should_run_a_directory_of_chapters() {
    let service = MockSpeechService::start().await;
    let work = TempDir::new().unwrap();
    let chapters = work.path().join("chapters");
    let output = work.path().join("out");
    std::fs::create_dir(&chapters).unwrap();
    let sources = write_inputs(&chapters, &[("01.txt", "One."), ("02.txt", "Two.")]);
    std::fs::write(chapters.join("notes.md"), "not a chapter").unwrap();

    service.happy_job(&sources[0], "job-1", b"one").await;
    service.happy_job(&sources[1], "job-2", b"two").await;

    let cli = Cli::try_parse_from([
        "voice-batch".to_string(),
        chapters.display().to_string(),
        "--output".to_string(),
        output.display().to_string(),
        "--config".to_string(),
        voice_config(work.path()).display().to_string(),
    ])
    .unwrap();

    handle_run(&cli, config_for(&service)).await.unwrap();

    assert_eq!(
        file_names(&output),
        vec!["01_voice_synthesis.mp3", "02_voice_synthesis.mp3"]
    );
}

#[tokio::test]
async fn it_should_exit_with_failure_when_a_job_fails() {
    let service = MockSpeechService::start().await;
    let work = TempDir::new().unwrap();
    let sources = write_inputs(work.path(), &[("lone.txt", "Alone.")]);

    service.accept_submission(&sources[0], "job-lone").await;
    service
        .job_failed("job-lone", &sources[0], "Voice not available")
        .await;

    let cli = Cli::try_parse_from([
        "voice-batch".to_string(),
        sources[0].display().to_string(),
        "--output".to_string(),
        work.path().join("out").display().to_string(),
        "--config".to_string(),
        voice_config(work.path()).display().to_string(),
    ])
    .unwrap();

    let err = handle_run(&cli, config_for(&service)).await.unwrap_err();

    assert!(matches!(err, AppError::Incomplete(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn it_should_reject_a_missing_input() {
    let service = MockSpeechService::start().await;
    let work = TempDir::new().unwrap();

    let cli = Cli::try_parse_from([
        "voice-batch".to_string(),
        work.path().join("nowhere").display().to_string(),
    ])
    .unwrap();

    let err = handle_run(&cli, config_for(&service)).await.unwrap_err();

    assert!(matches!(err, AppError::InputNotFound(_)));
}

#[tokio::test]
async fn it_should_ignore_chapters_with_an_upper_case_extension() {
    let service = MockSpeechService::start().await;
    let work = TempDir::new().unwrap();
    let chapters = work.path().join("chapters");
    let output = work.path().join("out");
    std::fs::create_dir(&chapters).unwrap();
    let sources = write_inputs(&chapters, &[("ch01.txt", "Lower."), ("ch01.TXT", "Upper.")]);

    service.happy_job(&sources[0], "job-lower", b"lower").await;

    let cli = Cli::try_parse_from([
        "voice-batch".to_string(),
        chapters.display().to_string(),
        "--output".to_string(),
        output.display().to_string(),
        "--config".to_string(),
        voice_config(work.path()).display().to_string(),
    ])
    .unwrap();

    handle_run(&cli, config_for(&service)).await.unwrap();

    assert_eq!(file_names(&output), vec!["ch01_voice_synthesis.mp3"]);
    assert_eq!(
        std::fs::read(output.join("ch01_voice_synthesis.mp3")).unwrap(),
        b"lower"
    );
}
