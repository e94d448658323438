use super::batch_synthesis_repository::RemoteError;
use super::tts_repository::TtsRepository;
use async_trait::async_trait;
use serde_json::Value;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const DEFAULT_VOICE: &str = "en-US-JennyNeural";

/// Azure Speech realtime implementation of the TTS repository
pub struct AzureTtsRepository {
    http_client: reqwest::Client,
    call_url: String,
    resource_key: String,
    output_format: String,
}

impl AzureTtsRepository {
    pub fn new(
        http_client: reqwest::Client,
        call_url: String,
        resource_key: String,
        output_format: String,
    ) -> Self {
        Self {
            http_client,
            call_url,
            resource_key,
            output_format,
        }
    }

    /// Build the SSML document for one chunk
    fn build_ssml(text: &str, voice_config: &Value) -> String {
        let voice = voice_config
            .get("voice")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VOICE);
        let rate = voice_config.get("rate").and_then(Self::attr_value);
        let pitch = voice_config.get("pitch").and_then(Self::attr_value);

        let body = escape_xml(text);
        let body = if rate.is_some() || pitch.is_some() {
            let mut attrs = String::new();
            if let Some(rate) = rate {
                attrs.push_str(&format!(" rate=\"{}\"", escape_xml(&rate)));
            }
            if let Some(pitch) = pitch {
                attrs.push_str(&format!(" pitch=\"{}\"", escape_xml(&pitch)));
            }
            format!("<prosody{}>{}</prosody>", attrs, body)
        } else {
            body
        };

        format!(
            "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"en-US\">\
             <voice name=\"{}\">{}</voice></speak>",
            escape_xml(voice),
            body
        )
    }

    fn attr_value(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl TtsRepository for AzureTtsRepository {
    async fn synthesize(&self, text: &str, voice_config: &Value) -> Result<Vec<u8>, RemoteError> {
        let ssml = Self::build_ssml(text, voice_config);

        tracing::debug!(
            text_length = text.len(),
            text_preview = %text.chars().take(80).collect::<String>(),
            "Calling realtime synthesis"
        );

        let response = self
            .http_client
            .post(&self.call_url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.resource_key)
            .header(OUTPUT_FORMAT_HEADER, &self.output_format)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .body(ssml)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, text_length = text.len(), "Realtime synthesis request failed");
                RemoteError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::http(status.as_u16(), body));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_size = audio.len(), "Realtime audio received");

        Ok(audio.to_vec())
    }
}
