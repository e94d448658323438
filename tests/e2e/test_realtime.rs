use crate::e2e::helpers::{file_names, write_inputs, MockSpeechService, REALTIME_PATH, RESOURCE_KEY};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use voice_batch::domain::synthesis::RealtimeSynthesizer;
use voice_batch::infrastructure::repositories::{AzureTtsRepository, TtsRepository};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn speak(service: &MockSpeechService, word: &str, audio: &[u8]) {
    Mock::given(method("POST"))
        .and(path(REALTIME_PATH))
        .and(header("Ocp-Apim-Subscription-Key", RESOURCE_KEY))
        .and(header("Content-Type", "application/ssml+xml"))
        .and(body_string_contains(word))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio.to_vec()))
        .mount(&service.server)
        .await;
}

async fn refuse(service: &MockSpeechService, word: &str) {
    Mock::given(method("POST"))
        .and(path(REALTIME_PATH))
        .and(body_string_contains(word))
        .respond_with(ResponseTemplate::new(500).set_body_string("synthesis backend down"))
        .mount(&service.server)
        .await;
}

fn synthesizer(service: &MockSpeechService, output: &std::path::Path) -> RealtimeSynthesizer {
    let repo: Arc<dyn TtsRepository> = Arc::new(AzureTtsRepository::new(
        reqwest::Client::new(),
        service.realtime_url(),
        RESOURCE_KEY.to_string(),
        "audio-24khz-48kbitrate-mono-mp3".to_string(),
    ));
    // Each test line below fits one chunk, two lines never do
    RealtimeSynthesizer::new(repo, output, 12, "mp3", 2)
}

#[tokio::test]
async fn it_should_merge_chunks_in_order() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(
        input.path(),
        &[("story.txt", "alpha line\nbeta line\ngamma line\n")],
    );

    speak(&service, "alpha", b"A").await;
    speak(&service, "beta", b"B").await;
    speak(&service, "gamma", b"C").await;

    let report = synthesizer(&service, output.path())
        .run(sources, Arc::new(json!({ "voice": "en-US-JennyNeural" })))
        .await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.written.len(), 1);
    assert_eq!(
        std::fs::read(output.path().join("story_voice_synthesis.mp3")).unwrap(),
        b"ABC"
    );
}

#[tokio::test]
async fn it_should_drop_only_the_file_with_a_failed_chunk() {
    let service = MockSpeechService::start().await;
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let sources = write_inputs(
        input.path(),
        &[
            ("good.txt", "alpha line\nbeta line\n"),
            ("bad.txt", "gamma line\npoison pill\n"),
        ],
    );

    speak(&service, "alpha", b"A").await;
    speak(&service, "beta", b"B").await;
    speak(&service, "gamma", b"C").await;
    refuse(&service, "poison").await;

    let report = synthesizer(&service, output.path())
        .run(sources, Arc::new(json!({})))
        .await;

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].subject.ends_with("bad.txt"));
    assert!(report.failures[0].message.contains("500"));
    assert_eq!(file_names(output.path()), vec!["good_voice_synthesis.mp3"]);
}
