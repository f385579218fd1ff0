//! Provider Adapters
//!
//! One adapter per distinct third-party wire protocol. Adapters translate
//! a generic task into a provider-specific HTTP call and the provider's
//! response back into a generic result. They are stateless translators:
//! all persisted state lives on the task record.
//!
//! Dispatch is keyed by the `AdapterKind` declared on the provider
//! configuration, decided once at configuration time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::types::provider::{AdapterKind, ProviderConfig};
use crate::types::task::Task;

pub mod minimax_video;
pub mod openai_image;
pub mod openai_video;

pub use minimax_video::MinimaxVideoAdapter;
pub use openai_image::OpenAiImageAdapter;
pub use openai_video::OpenAiVideoAdapter;

/// Deadline for generation submissions (sync and async)
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for status polls
pub const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a produced media asset lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Provider-hosted (often ephemeral) URL
    Url(String),
    /// Inline base64 payload with an optional declared mime type
    Inline { data: String, mime: Option<String> },
}

impl MediaSource {
    /// Canonical string rendering, usable as a media reference even when
    /// rehosting is skipped or fails
    pub fn as_reference(&self) -> String {
        match self {
            MediaSource::Url(url) => url.clone(),
            MediaSource::Inline { data, mime } => {
                let mime = mime.as_deref().unwrap_or("application/octet-stream");
                format!("data:{mime};base64,{data}")
            }
        }
    }
}

/// Result of a synchronous generation call
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub media: MediaSource,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Correlation handle for an asynchronous provider job
#[derive(Debug, Clone)]
pub struct AsyncHandle {
    pub provider_job_id: String,
}

/// What an invocation produced
#[derive(Debug, Clone)]
pub enum Invocation {
    /// The provider answered with a final result (image path)
    Completed(SyncResult),
    /// The provider accepted a job to be polled later (video path)
    Submitted(AsyncHandle),
}

/// Provider-side status of an asynchronous job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

/// Snapshot of an asynchronous job, as reported by one poll
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub status: JobStatus,
    /// Provider-reported progress, when the wire carries one
    pub progress: Option<u8>,
    /// Produced media, present only when `status` is `Completed`
    pub media: Option<MediaSource>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Provider error message, present only when `status` is `Failed`
    pub error: Option<String>,
}

impl PollOutcome {
    /// A still-running job
    pub fn pending(progress: Option<u8>) -> Self {
        Self {
            status: JobStatus::Pending,
            progress,
            media: None,
            width: None,
            height: None,
            error: None,
        }
    }

    /// A finished job with its media source
    pub fn completed(media: MediaSource) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: Some(100),
            media: Some(media),
            width: None,
            height: None,
            error: None,
        }
    }

    /// A failed job with the provider's error message
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: None,
            media: None,
            width: None,
            height: None,
            error: Some(error.into()),
        }
    }

    /// Record media dimensions
    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Protocol-specific translator between the generic task model and one
/// provider's wire format
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Wire protocol this adapter speaks
    fn kind(&self) -> AdapterKind;

    /// Issue a generation request.
    ///
    /// Image wires return `Invocation::Completed`; video wires return
    /// `Invocation::Submitted` with a correlation handle for polling.
    async fn invoke(&self, config: &ProviderConfig, task: &Task)
    -> Result<Invocation, BrokerError>;

    /// Poll an asynchronous job by its correlation handle.
    ///
    /// Synchronous wires reject this with `UnsupportedOperation`.
    async fn poll(&self, config: &ProviderConfig, job_id: &str)
    -> Result<PollOutcome, BrokerError>;
}

/// Resolve the adapter for a configured wire protocol
pub fn adapter_for(kind: AdapterKind, http: &reqwest::Client) -> Arc<dyn ProviderAdapter> {
    match kind {
        AdapterKind::OpenAiImage => Arc::new(OpenAiImageAdapter::new(http.clone())),
        AdapterKind::MinimaxVideo => Arc::new(MinimaxVideoAdapter::new(http.clone())),
        AdapterKind::OpenAiVideo => Arc::new(OpenAiVideoAdapter::new(http.clone())),
    }
}

/// Validate the configured endpoint before any network call.
///
/// Adapters fail fast with a configuration error on anything that is not
/// an absolute http(s) URL.
pub(crate) fn validate_endpoint(config: &ProviderConfig) -> Result<String, BrokerError> {
    let url = reqwest::Url::parse(config.base_url.trim()).map_err(|e| {
        BrokerError::ConfigurationError(format!(
            "provider '{}' endpoint '{}' is not a valid URL: {e}",
            config.name, config.base_url
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BrokerError::ConfigurationError(format!(
            "provider '{}' endpoint '{}' must use http or https",
            config.name, config.base_url
        )));
    }
    Ok(config.base_url.trim().trim_end_matches('/').to_string())
}

/// Credential for outbound authentication, or a configuration error
pub(crate) fn require_credential(config: &ProviderConfig) -> Result<&str, BrokerError> {
    match config.credential_str() {
        Some(c) if !c.trim().is_empty() => Ok(c),
        _ => Err(BrokerError::ConfigurationError(format!(
            "provider '{}' has no credential configured",
            config.name
        ))),
    }
}
