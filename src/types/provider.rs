//! Provider configuration types
//!
//! A `ProviderConfig` describes one externally reachable generation backend.
//! The admin surface owns these records; the broker core only reads them.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Media modality a provider serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Image,
    Video,
    /// Conversational assistant backends share the same registry but are
    /// never selected by the generation scheduler
    Assistant,
}

impl Modality {
    /// Fallback file extension when neither content-type nor URL reveal one
    pub fn default_extension(&self) -> &'static str {
        match self {
            Modality::Image => ".png",
            Modality::Video => ".mp4",
            Modality::Assistant => ".bin",
        }
    }

    /// Storage subdirectory for rehosted media of this modality
    pub fn storage_dir(&self) -> &'static str {
        match self {
            Modality::Image => "images",
            Modality::Video => "videos",
            Modality::Assistant => "files",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Image => write!(f, "image"),
            Modality::Video => write!(f, "video"),
            Modality::Assistant => write!(f, "assistant"),
        }
    }
}

/// Wire protocol an adapter speaks.
///
/// Decided once when the configuration is created, never re-derived from
/// the provider name at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    /// OpenAI-compatible `images/generations` wire (synchronous)
    OpenAiImage,
    /// MiniMax Hailuo video wire: submit, poll by task id, file retrieval
    MinimaxVideo,
    /// OpenAI-style `/v1/videos` wire with numeric progress reporting
    OpenAiVideo,
}

impl AdapterKind {
    /// Modality this wire protocol produces
    pub fn modality(&self) -> Modality {
        match self {
            AdapterKind::OpenAiImage => Modality::Image,
            AdapterKind::MinimaxVideo | AdapterKind::OpenAiVideo => Modality::Video,
        }
    }
}

/// One externally reachable generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name (operator-chosen; substring-matched by the
    /// selection policy, so operators should keep names unambiguous)
    pub name: String,
    /// Modality served
    pub modality: Modality,
    /// Wire protocol adapter
    pub adapter: AdapterKind,
    /// Disabled configurations are never selected
    pub enabled: bool,
    /// Higher priority is dispatched first
    pub priority: i32,
    /// Declared model list; empty means the provider accepts any model name
    #[serde(default)]
    pub models: Vec<String>,
    /// Base endpoint URL
    pub base_url: String,
    /// API credential; absent or blank makes the configuration ineligible
    #[serde(default, skip_serializing)]
    pub credential: Option<SecretString>,
    /// Requests-per-minute hint for operators (not enforced by the core)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
    /// Last configuration change, used as the recency tiebreak in selection
    pub updated_at: DateTime<Utc>,
}

impl ProviderConfig {
    /// Create an enabled configuration with default priority
    pub fn new(
        name: impl Into<String>,
        modality: Modality,
        adapter: AdapterKind,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            modality,
            adapter,
            enabled: true,
            priority: 0,
            models: Vec::new(),
            base_url: base_url.into(),
            credential: None,
            rate_limit_per_minute: None,
            updated_at: Utc::now(),
        }
    }

    /// Set the API credential
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(SecretString::from(credential.into()));
        self
    }

    /// Set dispatch priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declare a supported model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models.push(model.into());
        self
    }

    /// Declare the full supported model list
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Set the rate limit hint
    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = Some(per_minute);
        self
    }

    /// Override the configuration timestamp
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }

    /// Mark the configuration disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Credential string for outbound authentication.
    ///
    /// Eligibility is checked before dispatch, so a missing credential here
    /// is a configuration error rather than a silent empty header.
    pub fn credential_str(&self) -> Option<&str> {
        self.credential.as_ref().map(|c| c.expose_secret())
    }

    /// Whether the selection policy may consider this configuration.
    ///
    /// A blank credential makes a configuration ineligible regardless of
    /// the enabled flag.
    pub fn is_eligible(&self) -> bool {
        self.enabled
            && self
                .credential_str()
                .is_some_and(|c| !c.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credential_is_ineligible() {
        let base = ProviderConfig::new(
            "apix-images",
            Modality::Image,
            AdapterKind::OpenAiImage,
            "https://api.apix.example",
        );
        assert!(!base.is_eligible());

        let blank = base.clone().with_credential("   ");
        assert!(!blank.is_eligible());

        let ok = base.clone().with_credential("sk-test");
        assert!(ok.is_eligible());

        let off = ok.disabled();
        assert!(!off.is_eligible());
    }

    #[test]
    fn test_adapter_kind_modality() {
        assert_eq!(AdapterKind::OpenAiImage.modality(), Modality::Image);
        assert_eq!(AdapterKind::MinimaxVideo.modality(), Modality::Video);
        assert_eq!(AdapterKind::OpenAiVideo.modality(), Modality::Video);
    }

    #[test]
    fn test_adapter_kind_serde_tag() {
        let json = serde_json::to_string(&AdapterKind::OpenAiImage).unwrap();
        assert_eq!(json, "\"open-ai-image\"");
        let kind: AdapterKind = serde_json::from_str("\"minimax-video\"").unwrap();
        assert_eq!(kind, AdapterKind::MinimaxVideo);
    }
}
