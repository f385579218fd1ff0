//! MiniMax Hailuo video generation adapter
//!
//! Asynchronous wire: submit a generation task, poll it by task id, then
//! resolve the produced file id to a download URL. The status endpoint
//! reports coarse phases only, so polls return no numeric progress.

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
const DEFAULT_VIDEO_MODEL: &str = "MiniMax-Hailuo-2.3";

fn video_generation_url(base: &str) -> String {
    format!("{base}/v1/video_generation")
}

fn video_query_url(base: &str, task_id: &str) -> String {
    format!("{base}/v1/query/video_generation?task_id={task_id}")
}

fn file_retrieve_url(base: &str, file_id: &str) -> String {
    format!("{base}/v1/files/retrieve?file_id={file_id}")
}

#[derive(Debug, Serialize)]
struct VideoGenerationBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_frame_image: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct VideoGenerationResponse {
    #[serde(default)]
    task_id: String,
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    status_code: i32,
    #[serde(default)]
    status_msg: String,
}

#[derive(Debug, Deserialize)]
struct VideoQueryResponse {
    status: VideoPhase,
    file_id: Option<String>,
    video_width: Option<u32>,
    video_height: Option<u32>,
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum VideoPhase {
    Preparing,
    Queueing,
    Processing,
    Success,
    Fail,
}

#[derive(Debug, Deserialize)]
struct FileRetrieveResponse {
    file: Option<RetrievedFile>,
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct RetrievedFile {
    download_url: Option<String>,
}

/// Asynchronous MiniMax Hailuo video adapter
pub struct MinimaxVideoAdapter {
    http: reqwest::Client,
}

impl MinimaxVideoAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Resolve a finished task's file id to its download URL
    async fn retrieve_file(
        &self,
        config: &ProviderConfig,
        base: &str,
        credential: &str,
        file_id: &str,
    ) -> Result<String, BrokerError> {
        let response = self
            .http
            .get(file_retrieve_url(base, file_id))
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
                format!("file retrieval failed: {text}"),
            ));
        }

        let parsed: FileRetrieveResponse = response.json().await.map_err(|e| {
            BrokerError::ParseError(format!("failed to parse file retrieval response: {e}"))
        })?;
        check_base_resp(&config.name, parsed.base_resp.as_ref())?;

        parsed
            .file
            .and_then(|f| f.download_url)
            .ok_or_else(|| {
                BrokerError::provider_rejected(
                    &config.name,
                    status.as_u16(),
                    format!("file '{file_id}' has no download URL"),
                )
            })
    }
}

#[async_trait]
impl ProviderAdapter for MinimaxVideoAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::MinimaxVideo
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
        let body = VideoGenerationBody {
            model,
            prompt: &task.prompt,
            duration: video_params.and_then(|p| p.duration),
            resolution: video_params.and_then(|p| p.resolution.as_deref()),
            first_frame_image: task.source_image.as_deref(),
        };

        let response = self
            .http
            .post(video_generation_url(&base))
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
                format!("video generation failed: {text}"),
            ));
        }

        let parsed: VideoGenerationResponse = response.json().await.map_err(|e| {
            BrokerError::ParseError(format!("failed to parse video generation response: {e}"))
        })?;
        check_base_resp(&config.name, parsed.base_resp.as_ref())?;

        if parsed.task_id.is_empty() {
            return Err(BrokerError::provider_rejected(
                &config.name,
                status.as_u16(),
                "submission response carried no task id",
            ));
        }

        Ok(Invocation::Submitted(AsyncHandle {
            provider_job_id: parsed.task_id,
        }))
    }

    async fn poll(&self, config: &ProviderConfig, job_id: &str)
    -> Result<PollOutcome, BrokerError> {
        let base = validate_endpoint(config)?;
        let credential = require_credential(config)?;

        let response = self
            .http
            .get(video_query_url(&base, job_id))
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
                format!("video status query failed: {text}"),
            ));
        }

        let parsed: VideoQueryResponse = response.json().await.map_err(|e| {
            BrokerError::ParseError(format!("failed to parse video status response: {e}"))
        })?;

        match parsed.status {
            VideoPhase::Preparing | VideoPhase::Queueing | VideoPhase::Processing => {
                // The wire reports phases, not percentages.
                Ok(PollOutcome::pending(None))
            }
            VideoPhase::Fail => {
                let message = parsed
                    .base_resp
                    .map(|b| b.status_msg)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "video generation failed".to_string());
                Ok(PollOutcome::failed(message))
            }
            VideoPhase::Success => {
                let file_id = parsed.file_id.ok_or_else(|| {
                    BrokerError::provider_rejected(
                        &config.name,
                        status.as_u16(),
                        "successful task reported no file id",
                    )
                })?;
                let url = self
                    .retrieve_file(config, &base, credential, &file_id)
                    .await?;
                Ok(PollOutcome::completed(MediaSource::Url(url))
                    .with_dimensions(parsed.video_width, parsed.video_height))
            }
        }
    }
}

/// MiniMax reports logical failures inside a 200 response; a non-zero
/// status code there is still a rejection.
fn check_base_resp(provider: &str, base_resp: Option<&BaseResp>) -> Result<(), BrokerError> {
    if let Some(resp) = base_resp
        && resp.status_code != 0
    {
        return Err(BrokerError::provider_rejected(
            provider,
            200,
            format!("provider status {}: {}", resp.status_code, resp.status_msg),
        ));
    }
    Ok(())
}
