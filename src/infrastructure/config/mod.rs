use crate::domain::synthesis::PipelineSettings;
use crate::error::{AppError, AppResult};
use serde_json::Value;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Audio format requested from the service
pub const DEFAULT_OUTPUT_FORMAT: &str = "audio-48khz-192kbitrate-mono-mp3";

const BATCH_SYNTHESIS_PATH: &str = "api/texttospeech/3.1-preview1/batchsynthesis";
const REALTIME_TTS_PATH: &str = "cognitiveservices/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub resource_key: String,
    pub azure_region: String,
    pub azure_endpoint: String,
    /// Replaces the region-derived host, e.g. for a local mock service
    pub base_url: Option<String>,
    pub log_format: LogFormat,
    pub output_format: String,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let resource_key = lookup("RESOURCE_KEY")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "Please set the RESOURCE_KEY environment variable to use this tool".to_string(),
                )
            })?;

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            submit_concurrency: parse_or(&lookup, "SUBMIT_CONCURRENCY", defaults.submit_concurrency)?,
            download_concurrency: parse_or(&lookup, "DOWNLOAD_CONCURRENCY", defaults.download_concurrency)?,
            realtime_concurrency: parse_or(&lookup, "REALTIME_CONCURRENCY", defaults.realtime_concurrency)?,
            poll_interval: Duration::from_secs(parse_or(
                &lookup,
                "POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )?),
            poll_throttle: Duration::from_millis(parse_or(
                &lookup,
                "POLL_THROTTLE_MS",
                defaults.poll_throttle.as_millis() as u64,
            )?),
            poll_timeout: match lookup("POLL_TIMEOUT_SECS") {
                Some(raw) => Some(Duration::from_secs(parse_value("POLL_TIMEOUT_SECS", &raw)?)),
                None => None,
            },
            download_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DOWNLOAD_TIMEOUT_SECS",
                defaults.download_timeout.as_secs(),
            )?),
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", defaults.chunk_size)?,
            archive_entry_extension: lookup("ARCHIVE_ENTRY_EXTENSION")
                .unwrap_or(defaults.archive_entry_extension),
        };

        if pipeline.chunk_size == 0 {
            return Err(AppError::Config("CHUNK_SIZE must be greater than zero".to_string()));
        }

        let config = Config {
            resource_key,
            azure_region: lookup("AZURE_REGION").unwrap_or_else(|| "northeurope".to_string()),
            azure_endpoint: lookup("AZURE_ENDPOINT")
                .unwrap_or_else(|| "customvoice.api.speech.microsoft.com".to_string()),
            base_url: lookup("AZURE_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            output_format: lookup("OUTPUT_FORMAT")
                .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string()),
            pipeline,
        };

        Ok(config)
    }

    /// Endpoint for batch synthesis jobs
    pub fn batch_synthesis_url(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.{}", self.azure_region, self.azure_endpoint));
        format!("{}/{}", base, BATCH_SYNTHESIS_PATH)
    }

    /// Endpoint for realtime synthesis
    pub fn realtime_tts_url(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.tts.speech.microsoft.com", self.azure_region));
        format!("{}/{}", base, REALTIME_TTS_PATH)
    }

    /// File extension matching the requested audio format
    pub fn audio_extension(&self) -> &str {
        if self.output_format.starts_with("riff-") {
            return "wav";
        }
        self.output_format
            .rsplit('-')
            .next()
            .filter(|ext| !ext.is_empty())
            .unwrap_or("mp3")
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid value for {}: '{}' ({})", key, raw, e)))
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

/// Load the voice configuration forwarded to the service
///
/// The document stays opaque apart from having to be a JSON object.
pub fn load_voice_config(path: &Path) -> AppResult<Value> {
    if !path.is_file() {
        return Err(AppError::Config(format!(
            "The voice configuration file {} does not exist",
            path.display()
        )));
    }

    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| {
        AppError::Config(format!("invalid voice configuration {}: {}", path.display(), e))
    })?;

    if !value.is_object() {
        return Err(AppError::Config(format!(
            "voice configuration {} must be a JSON object",
            path.display()
        )));
    }

    Ok(value)
}
