//! OpenAI-style video generation adapter
//!
//! Asynchronous wire: `POST /v1/videos` creates a job, `GET /v1/videos/{id}`
//! reports status with a numeric progress percentage, and the finished
//! asset is served from `/v1/videos/{id}/content`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::{
    AsyncHandle, Invocation, MediaSource, POLL_TIMEOUT, PollOutcome, ProviderAdapter,
    SUBMIT_TIMEOUT, require_credential, validate_endpoint,
};
use crate::error::BrokerError;
use crate::types::provider::{AdapterKind, ProviderConfig};
use crate::types::task::Task;

/// Model used when neither the task nor the configuration names one
const DEFAULT_VIDEO_MODEL: &str = "sora-2";

#[derive(Debug, Serialize)]
struct CreateVideoBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_reference: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct VideoJob {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    progress: Option<u8>,
    error: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    #[serde(default)]
    message: String,
}

/// Asynchronous OpenAI-style video adapter
pub struct OpenAiVideoAdapter {
    http: reqwest::Client,
}

impl OpenAiVideoAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiVideoAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::OpenAiVideo
    }

    async fn invoke(
        &self,
        config: &ProviderConfig,
        task: &Task,
    ) -> Result<Invocation, BrokerError> {
        let base = validate_endpoint(config)?;
        let credential = require_credential(config)?;

        let model = task
            .model
            .as_deref()
            .or_else(|| config.models.first().map(String::as_str))
            .unwrap_or(DEFAULT_VIDEO_MODEL);
        let video_params = task.params.as_video();
        let body = CreateVideoBody {
            model,
            prompt: &task.prompt,
            seconds: video_params.and_then(|p| p.duration),
            size: video_params.and_then(|p| p.resolution.as_deref()),
            input_reference: task.source_image.as_deref(),
        };

        let response = self
            .http
            .post(format!("{base}/v1/videos"))
            .timeout(SUBMIT_TIMEOUT)
            .header("Authorization", format!("Bearer {credential}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| BrokerError::from_transport(&config.name, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BrokerError::provider_rejected(
                &config.name,
                status.as_u16(),
                format!("video job creation failed: {text}"),
            ));
        }

        let job: VideoJob = response.json().await.map_err(|e| {
            BrokerError::ParseError(format!("failed to parse video job response: {e}"))
        })?;
        if job.id.is_empty() {
            return Err(BrokerError::provider_rejected(
                &config.name,
                status.as_u16(),
                "job creation response carried no id",
            ));
        }

        Ok(Invocation::Submitted(AsyncHandle {
            provider_job_id: job.id,
        }))
    }

    async fn poll(&self, config: &ProviderConfig, job_id: &str)
    -> Result<PollOutcome, BrokerError> {
        let base = validate_endpoint(config)?;
        let credential = require_credential(config)?;

        let response = self
            .http
            .get(format!("{base}/v1/videos/{job_id}"))
            .timeout(POLL_TIMEOUT)
            .header("Authorization", format!("Bearer {credential}"))
            .send()
            .await
            .map_err(|e| BrokerError::from_transport(&config.name, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BrokerError::provider_rejected(
                &config.name,
                status.as_u16(),
                format!("video job query failed: {text}"),
            ));
        }

        let job: VideoJob = response.json().await.map_err(|e| {
            BrokerError::ParseError(format!("failed to parse video job response: {e}"))
        })?;

        match job.status.as_str() {
            "completed" => {
                let url = format!("{base}/v1/videos/{job_id}/content");
                Ok(PollOutcome::completed(MediaSource::Url(url)))
            }
            "failed" => {
                let message = job
                    .error
                    .map(|e| e.message)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "video job failed".to_string());
                Ok(PollOutcome::failed(message))
            }
            // "queued" | "in_progress" and anything the wire adds later
            _ => Ok(PollOutcome::pending(job.progress.map(|p| p.min(100)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_parsing_with_progress() {
        let job: VideoJob = serde_json::from_str(
            r#"{"id":"video_123","status":"in_progress","progress":45,"model":"sora-2"}"#,
        )
        .unwrap();
        assert_eq!(job.id, "video_123");
        assert_eq!(job.status, "in_progress");
        assert_eq!(job.progress, Some(45));
    }

    #[test]
    fn test_job_parsing_failure_detail() {
        let job: VideoJob = serde_json::from_str(
            r#"{"id":"video_123","status":"failed","error":{"code":"moderation_blocked","message":"content policy"}}"#,
        )
        .unwrap();
        assert_eq!(job.error.unwrap().message, "content policy");
    }
}
