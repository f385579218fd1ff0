//! OpenAI-compatible image generation adapter
//!
//! Speaks the `POST /v1/images/generations` wire shared by OpenAI and the
//! many compatible image backends. This is the synchronous path: a
//! successful call carries the final result (URL or inline base64).
//!
//! When the task supplied no explicit model and the configuration declares
//! several, a provider-side "model unavailable" rejection triggers one
//! attempt with the next declared model before the failure surfaces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::{
    Invocation, MediaSource, PollOutcome, ProviderAdapter, SUBMIT_TIMEOUT, SyncResult,
    require_credential, validate_endpoint,
};
use crate::error::BrokerError;
use crate::types::provider::{AdapterKind, ProviderConfig};
use crate::types::task::Task;

/// Structured error codes that mean "this model is unavailable here".
const MODEL_UNAVAILABLE_CODES: &[&str] =
    &["model_not_found", "model_not_available", "model_not_exist"];

/// Free-text fallback phrases for providers that return no error code.
/// Best-effort and deliberately short; an unmatched rejection stays terminal.
const MODEL_UNAVAILABLE_PHRASES: &[&str] = &[
    "model not found",
    "model does not exist",
    "invalid model",
    "no permission to model",
];

#[derive(Debug, Serialize)]
struct ImageGenerationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    code: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// One dispatch attempt's failure, split so the caller can decide whether
/// the next declared model is worth trying
enum AttemptError {
    ModelUnavailable { status: u16, message: String },
    Terminal(BrokerError),
}

/// Synchronous OpenAI-compatible image adapter
pub struct OpenAiImageAdapter {
    http: reqwest::Client,
}

impl OpenAiImageAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn generate_once(
        &self,
        config: &ProviderConfig,
        task: &Task,
        base: &str,
        model: Option<&str>,
    ) -> Result<SyncResult, AttemptError> {
        let credential = require_credential(config).map_err(AttemptError::Terminal)?;
        let image_params = task.params.as_image();
        let body = ImageGenerationBody {
            model,
            prompt: &task.prompt,
            n: 1,
            negative_prompt: task.negative_prompt.as_deref(),
            image: task.source_image.as_deref(),
            size: image_params.and_then(|p| p.size.as_deref()),
            quality: image_params.and_then(|p| p.quality.as_deref()),
            style: image_params.and_then(|p| p.style.as_deref()),
            seed: image_params.and_then(|p| p.seed),
        };

        let response = self
            .http
            .post(format!("{base}/v1/images/generations"))
            .timeout(SUBMIT_TIMEOUT)
            .header("Authorization", format!("Bearer {credential}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AttemptError::Terminal(BrokerError::from_transport(&config.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_rejection(&config.name, status.as_u16(), &text));
        }

        let parsed: ImagesResponse = response.json().await.map_err(|e| {
            AttemptError::Terminal(BrokerError::ParseError(format!(
                "failed to parse image generation response: {e}"
            )))
        })?;

        // Absence of a recognizable result is a failure, never a silent
        // partial success.
        let datum = parsed.data.into_iter().next().ok_or_else(|| {
            AttemptError::Terminal(BrokerError::provider_rejected(
                &config.name,
                status.as_u16(),
                "response contained no generated image",
            ))
        })?;

        let media = if let Some(url) = datum.url {
            MediaSource::Url(url)
        } else if let Some(data) = datum.b64_json {
            MediaSource::Inline { data, mime: None }
        } else {
            return Err(AttemptError::Terminal(BrokerError::provider_rejected(
                &config.name,
                status.as_u16(),
                "generated image carried neither url nor b64_json",
            )));
        };

        Ok(SyncResult {
            media,
            width: None,
            height: None,
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiImageAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::OpenAiImage
    }

    async fn invoke(
        &self,
        config: &ProviderConfig,
        task: &Task,
    ) -> Result<Invocation, BrokerError> {
        let base = validate_endpoint(config)?;

        // Model fallback only applies when the task pinned nothing and the
        // configuration declares alternatives.
        let attempts: Vec<Option<String>> = match &task.model {
            Some(model) => vec![Some(model.clone())],
            None if !config.models.is_empty() => {
                config.models.iter().map(|m| Some(m.clone())).collect()
            }
            None => vec![None],
        };
        let last = attempts.len() - 1;

        for (i, model) in attempts.iter().enumerate() {
            match self
                .generate_once(config, task, &base, model.as_deref())
                .await
            {
                Ok(result) => return Ok(Invocation::Completed(result)),
                Err(AttemptError::ModelUnavailable { message, .. }) if i < last => {
                    tracing::warn!(
                        provider = %config.name,
                        model = model.as_deref().unwrap_or("-"),
                        %message,
                        "model unavailable, trying next declared model"
                    );
                }
                Err(AttemptError::ModelUnavailable { status, message }) => {
                    return Err(BrokerError::provider_rejected(&config.name, status, message));
                }
                Err(AttemptError::Terminal(err)) => return Err(err),
            }
        }
        unreachable!("attempt list is never empty")
    }

    async fn poll(&self, config: &ProviderConfig, _job_id: &str)
    -> Result<PollOutcome, BrokerError> {
        Err(BrokerError::UnsupportedOperation(format!(
            "provider '{}' uses a synchronous image wire and cannot be polled",
            config.name
        )))
    }
}

/// Classify a non-2xx image response body.
///
/// Structured `error.code` values win; the phrase list is a bounded
/// fallback for providers that only return prose.
fn classify_rejection(provider: &str, status: u16, body: &str) -> AttemptError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or_default();
    let message = if parsed.message.is_empty() {
        body.to_string()
    } else {
        parsed.message.clone()
    };

    let code_matches = parsed
        .code
        .as_deref()
        .or(parsed.kind.as_deref())
        .is_some_and(|c| MODEL_UNAVAILABLE_CODES.contains(&c));
    let lowered = message.to_lowercase();
    let phrase_matches = MODEL_UNAVAILABLE_PHRASES
        .iter()
        .any(|p| lowered.contains(p));

    if code_matches || phrase_matches {
        AttemptError::ModelUnavailable { status, message }
    } else {
        AttemptError::Terminal(BrokerError::provider_rejected(provider, status, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_model_unavailable(provider: &str, status: u16, body: &str) -> bool {
        matches!(
            classify_rejection(provider, status, body),
            AttemptError::ModelUnavailable { .. }
        )
    }

    #[test]
    fn test_structured_code_wins() {
        let body = r#"{"error":{"message":"whatever the prose says","code":"model_not_found"}}"#;
        assert!(is_model_unavailable("apix", 404, body));
    }

    #[test]
    fn test_phrase_fallback_is_bounded() {
        let body = r#"{"error":{"message":"The requested model does not exist"}}"#;
        assert!(is_model_unavailable("apix", 404, body));

        let body = r#"{"error":{"message":"quota exceeded for project"}}"#;
        assert!(!is_model_unavailable("apix", 429, body));
    }

    #[test]
    fn test_unparseable_body_is_terminal() {
        assert!(!is_model_unavailable("apix", 500, "<html>bad gateway</html>"));
        match classify_rejection("apix", 500, "<html>bad gateway</html>") {
            AttemptError::Terminal(BrokerError::ProviderRejected {
                status, message, ..
            }) => {
                assert_eq!(status, 500);
                assert!(message.contains("bad gateway"));
            }
            _ => panic!("expected terminal rejection"),
        }
    }
}
