//! Generation task types
//!
//! A `Task` is a single user-submitted generation request and its lifecycle
//! record. Parameters are a tagged union validated against the task kind at
//! creation time, so the orchestration core never touches free-form JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, FailureKind};
use crate::types::provider::Modality;

/// What the task asks a provider to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    TextToImage,
    ImageToImage,
    TextToVideo,
    ImageToVideo,
}

impl TaskKind {
    /// Modality of the produced media
    pub fn modality(&self) -> Modality {
        match self {
            TaskKind::TextToImage | TaskKind::ImageToImage => Modality::Image,
            TaskKind::TextToVideo | TaskKind::ImageToVideo => Modality::Video,
        }
    }

    /// Whether this kind consumes a user-supplied source image
    pub fn takes_source_image(&self) -> bool {
        matches!(self, TaskKind::ImageToImage | TaskKind::ImageToVideo)
    }
}

/// Task lifecycle state
///
/// Transitions only move forward: `Pending → Processing → {Completed, Failed}`.
/// A task never re-enters `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    /// Check if this state permits a transition to `next`
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Processing)
                | (TaskState::Processing, TaskState::Completed)
                | (TaskState::Processing, TaskState::Failed)
        )
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Processing => write!(f, "processing"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Image generation parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageParams {
    /// Image size (e.g., "1024x1024")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Quality setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Style setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Random seed for reproducibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ImageParams {
    /// Set image size
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Set quality
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Set style
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Video generation parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoParams {
    /// Video duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Video resolution (e.g., "720P", "1080P")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Aspect ratio (e.g., "16:9")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

impl VideoParams {
    /// Set duration in seconds
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set resolution
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    /// Set aspect ratio
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }
}

/// Per-kind generation parameters, validated against the task kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "snake_case")]
pub enum GenerationParams {
    Image(ImageParams),
    Video(VideoParams),
}

impl GenerationParams {
    /// Modality these parameters apply to
    pub fn modality(&self) -> Modality {
        match self {
            GenerationParams::Image(_) => Modality::Image,
            GenerationParams::Video(_) => Modality::Video,
        }
    }

    /// Image parameters, when present
    pub fn as_image(&self) -> Option<&ImageParams> {
        match self {
            GenerationParams::Image(p) => Some(p),
            GenerationParams::Video(_) => None,
        }
    }

    /// Video parameters, when present
    pub fn as_video(&self) -> Option<&VideoParams> {
        match self {
            GenerationParams::Video(p) => Some(p),
            GenerationParams::Image(_) => None,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams::Image(ImageParams::default())
    }
}

/// A single generation request and its lifecycle record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Opaque task id
    pub id: String,
    /// Owning user id
    pub owner_id: String,
    /// Requested operation
    pub kind: TaskKind,
    /// Text prompt
    pub prompt: String,
    /// Negative prompt (what to avoid)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Source image reference for image-input kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
    /// Validated per-kind parameters
    pub params: GenerationParams,
    /// Explicit model hint supplied at submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider routing hint derived from the model hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_hint: Option<String>,
    /// Lifecycle state
    pub state: TaskState,
    /// Progress 0-100, non-decreasing once Processing
    pub progress: u8,
    /// Provider the task was dispatched to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    /// Provider-opaque correlation handle for async jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_job_id: Option<String>,
    /// Local media reference once Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_reference: Option<String>,
    /// Failure classification once Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Human-readable error message once Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new `Pending` task.
    ///
    /// Fails with `InvalidInput` when the parameter union does not match
    /// the kind's modality, so the orchestration core only ever sees
    /// consistent records.
    pub fn new(
        owner_id: impl Into<String>,
        kind: TaskKind,
        prompt: impl Into<String>,
        params: GenerationParams,
    ) -> Result<Self, BrokerError> {
        if params.modality() != kind.modality() {
            return Err(BrokerError::InvalidInput(format!(
                "{:?} parameters do not match task kind {:?}",
                params.modality(),
                kind
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            kind,
            prompt: prompt.into(),
            negative_prompt: None,
            source_image: None,
            params,
            model: None,
            provider_hint: None,
            state: TaskState::Pending,
            progress: 0,
            provider_name: None,
            provider_job_id: None,
            result_reference: None,
            failure: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Set negative prompt
    pub fn with_negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(prompt.into());
        self
    }

    /// Set source image reference
    pub fn with_source_image(mut self, reference: impl Into<String>) -> Self {
        self.source_image = Some(reference.into());
        self
    }

    /// Set explicit model hint
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set provider routing hint
    pub fn with_provider_hint(mut self, hint: impl Into<String>) -> Self {
        self.provider_hint = Some(hint.into());
        self
    }

    /// Modality of the requested media
    pub fn modality(&self) -> Modality {
        self.kind.modality()
    }

    /// Validate input completeness before the task is accepted
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.prompt.trim().is_empty() && self.source_image.is_none() {
            return Err(BrokerError::InvalidInput(
                "task needs a prompt or a source image".to_string(),
            ));
        }
        if self.kind.takes_source_image() && self.source_image.is_none() {
            return Err(BrokerError::InvalidInput(format!(
                "{:?} requires a source image",
                self.kind
            )));
        }
        Ok(())
    }
}
