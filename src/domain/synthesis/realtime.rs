use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::chunker::split_into_chunks;
use super::error::SynthesisError;
use super::model::{reject_output_collisions, source_basename, InputUnit};
use super::report::ItemFailure;
use crate::infrastructure::repositories::TtsRepository;
use crate::infrastructure::storage::output_file_name;

/// Result of synthesizing one input file in realtime mode
#[derive(Debug)]
pub enum RealtimeOutcome {
    Written { source: PathBuf, path: PathBuf, chunks: usize },
    Failed { source: PathBuf, error: SynthesisError },
}

/// Aggregate result of a realtime run
#[derive(Debug, Default)]
pub struct RealtimeReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
}

impl RealtimeReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RealtimeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Realtime synthesis: {} written, {} failed",
            self.written.len(),
            self.failures.len()
        )?;
        for failure in &self.failures {
            writeln!(f, "  {}", failure)?;
        }
        if self.is_success() {
            write!(f, "Successfully synthesized {} file(s)", self.written.len())
        } else {
            write!(f, "Run incomplete: {} file(s) failed", self.failures.len())
        }
    }
}

/// Synthesizes whole files chunk by chunk, without the remote job lifecycle
pub struct RealtimeSynthesizer {
    tts_repo: Arc<dyn TtsRepository>,
    output_dir: PathBuf,
    chunk_size: usize,
    audio_extension: String,
    concurrency: usize,
}

impl RealtimeSynthesizer {
    pub fn new(
        tts_repo: Arc<dyn TtsRepository>,
        output_dir: impl Into<PathBuf>,
        chunk_size: usize,
        audio_extension: &str,
        concurrency: usize,
    ) -> Self {
        Self {
            tts_repo,
            output_dir: output_dir.into(),
            chunk_size: chunk_size.max(1),
            audio_extension: audio_extension.trim_start_matches('.').to_string(),
            concurrency: concurrency.max(1),
        }
    }

    /// Synthesize every file under one bounded pool
    pub async fn run(&self, files: Vec<PathBuf>, voice_config: Arc<Value>) -> RealtimeReport {
        let (files, collisions) = reject_output_collisions(files, PathBuf::as_path);

        let outcomes: Vec<RealtimeOutcome> = stream::iter(files)
            .map(|file| {
                let voice_config = Arc::clone(&voice_config);
                async move { self.synthesize_file(&file, &voice_config).await }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = RealtimeReport {
            failures: collisions,
            ..RealtimeReport::default()
        };
        for outcome in outcomes {
            match outcome {
                RealtimeOutcome::Written { path, .. } => report.written.push(path),
                RealtimeOutcome::Failed { source, error } => report
                    .failures
                    .push(ItemFailure::new(source.display().to_string(), error.to_string())),
            }
        }
        report
    }

    /// Synthesize one file; nothing is written unless every chunk succeeds
    pub async fn synthesize_file(&self, source: &Path, voice_config: &Value) -> RealtimeOutcome {
        match self.try_synthesize_file(source, voice_config).await {
            Ok((path, chunks)) => {
                tracing::info!(
                    source = %source.display(),
                    output = %path.display(),
                    chunks,
                    "Realtime synthesis written"
                );
                RealtimeOutcome::Written {
                    source: source.to_path_buf(),
                    path,
                    chunks,
                }
            }
            Err(error) => {
                tracing::error!(source = %source.display(), error = %error, "Realtime synthesis failed");
                RealtimeOutcome::Failed {
                    source: source.to_path_buf(),
                    error,
                }
            }
        }
    }

    async fn try_synthesize_file(
        &self,
        source: &Path,
        voice_config: &Value,
    ) -> Result<(PathBuf, usize), SynthesisError> {
        let text = tokio::fs::read_to_string(source).await?;
        let units: Vec<InputUnit> = split_into_chunks(&text, self.chunk_size)
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| InputUnit::new(source, chunk, index))
            .collect();

        tracing::info!(
            source = %source.display(),
            chunk_count = units.len(),
            text_length = text.len(),
            "Text split into chunks"
        );

        let mut merged_audio = Vec::new();
        for unit in &units {
            let audio = self
                .tts_repo
                .synthesize(unit.text(), voice_config)
                .await
                .map_err(SynthesisError::synthesis)?;
            merged_audio.extend(audio);

            tracing::debug!(
                chunk_index = unit.index(),
                total_audio_size = merged_audio.len(),
                "Chunk synthesized and merged"
            );
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let name = output_file_name(
            &source_basename(source),
            &format!(".{}", self.audio_extension),
        );
        let path = self.output_dir.join(name);
        tokio::fs::write(&path, &merged_audio).await?;

        Ok((path, units.len()))
    }
}
