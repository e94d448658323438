use super::RemoteError;
use async_trait::async_trait;
use serde_json::Value;

/// Repository for realtime TTS synthesis.
/// Abstracts the underlying speech provider.
///
/// Implementations synthesize exactly one chunk per call. Splitting text
/// and merging the audio of consecutive chunks is the caller's job.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize one chunk of text with the given voice configuration
    ///
    /// Returns the encoded audio bytes for the chunk
    ///
    /// # Arguments
    /// * `text` - The chunk to synthesize
    /// * `voice_config` - Voice parameters (voice name, rate, pitch)
    ///
    /// # Errors
    /// Returns error if synthesis fails or the provider is unavailable
    async fn synthesize(&self, text: &str, voice_config: &Value) -> Result<Vec<u8>, RemoteError>;
}
