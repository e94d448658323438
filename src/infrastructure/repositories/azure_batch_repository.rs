use super::batch_synthesis_repository::{BatchSynthesisRepository, RemoteError};
use crate::domain::synthesis::{InputUnit, JobId, JobState, PollResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const DISPLAY_NAME: &str = "Text to Voice Synthesis Batch Job";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    display_name: &'a str,
    description: String,
    text_type: &'a str,
    synthesis_config: &'a Value,
    inputs: Vec<SubmitInput<'a>>,
    properties: SubmitProperties<'a>,
}

#[derive(Debug, Serialize)]
struct SubmitInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitProperties<'a> {
    output_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    outputs: Option<JobOutputs>,
    #[serde(default)]
    properties: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JobOutputs {
    #[serde(default)]
    result: Option<String>,
}

/// Azure Speech batch synthesis implementation of the batch repository
pub struct AzureBatchRepository {
    http_client: reqwest::Client,
    call_url: String,
    resource_key: String,
    output_format: String,
}

impl AzureBatchRepository {
    pub fn new(
        http_client: reqwest::Client,
        call_url: String,
        resource_key: String,
        output_format: String,
    ) -> Self {
        Self {
            http_client,
            call_url: call_url.trim_end_matches('/').to_string(),
            resource_key,
            output_format,
        }
    }

    fn map_status(status: &str) -> JobState {
        match status {
            "NotStarted" | "Running" => JobState::Running,
            "Succeeded" => JobState::Succeeded,
            "Failed" => JobState::Failed,
            other => {
                tracing::warn!(status = other, "Unrecognized batch synthesis status");
                JobState::Unknown
            }
        }
    }

    fn failure_message(properties: Option<&Value>) -> Option<String> {
        properties?
            .get("error")?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }

    async fn error_from_response(response: reqwest::Response) -> RemoteError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        RemoteError::http(status, body)
    }
}

#[async_trait]
impl BatchSynthesisRepository for AzureBatchRepository {
    async fn submit(&self, unit: &InputUnit, voice_config: &Value) -> Result<JobId, RemoteError> {
        let payload = SubmitRequest {
            display_name: DISPLAY_NAME,
            description: unit.source().display().to_string(),
            text_type: "PlainText",
            synthesis_config: voice_config,
            inputs: vec![SubmitInput { text: unit.text() }],
            properties: SubmitProperties {
                output_format: &self.output_format,
            },
        };

        tracing::debug!(
            source = %unit.source().display(),
            text_length = unit.text().len(),
            "Submitting batch synthesis job"
        );

        let response = self
            .http_client
            .post(&self.call_url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.resource_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, source = %unit.source().display(), "Submission request failed");
                RemoteError::from(e)
            })?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::transport(format!("invalid submission response: {}", e)))?;

        Ok(JobId(body.id))
    }

    async fn poll(&self, job_id: &JobId) -> PollResponse {
        let url = format!("{}/{}", self.call_url, job_id);

        let response = match self
            .http_client
            .get(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.resource_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return PollResponse::unknown(format!(
                    "error checking the status of job {}: {}",
                    job_id, e
                ))
            }
        };

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            return PollResponse::unknown(format!(
                "error checking the status of job {}: {}",
                job_id, err
            ));
        }

        let body: JobStatusResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return PollResponse::unknown(format!(
                    "invalid status response for job {}: {}",
                    job_id, e
                ))
            }
        };

        let state = Self::map_status(&body.status);
        let message = match state {
            JobState::Failed => Self::failure_message(body.properties.as_ref()),
            JobState::Unknown => Some(format!("unrecognized status '{}'", body.status)),
            _ => None,
        };

        PollResponse {
            state,
            result_uri: body.outputs.and_then(|o| o.result),
            source_ref: body.description,
            message,
        }
    }

    async fn fetch(&self, result_uri: &str) -> Result<Vec<u8>, RemoteError> {
        // Result URIs are pre-signed, no subscription key
        let response = self.http_client.get(result_uri).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn list_jobs(&self) -> Result<Value, RemoteError> {
        let response = self
            .http_client
            .get(&self.call_url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.resource_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let mut body: Value = response.json().await?;
        if let Some(values) = body.get_mut("values") {
            return Ok(values.take());
        }
        Ok(body)
    }
}
