//! Result artifact types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::provider::Modality;
use crate::types::task::Task;

/// The durable output record of a completed task.
///
/// Created exactly once per successful completion and never mutated by the
/// broker core afterward. Downstream bookkeeping (view counters and the
/// like) lives outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultArtifact {
    /// Opaque artifact id
    pub id: String,
    /// Task that produced this artifact
    pub task_id: String,
    /// Owning user id
    pub owner_id: String,
    /// Media modality
    pub modality: Modality,
    /// Durable local media reference
    pub local_reference: String,
    /// Original provider-hosted reference, kept for audit
    pub original_reference: String,
    /// Media width in pixels, when the provider reported it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Media height in pixels, when the provider reported it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Video duration in seconds, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Originating prompt
    pub prompt: String,
    /// Model that produced the media, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ResultArtifact {
    /// Build an artifact for a completed task
    pub fn for_task(
        task: &Task,
        local_reference: impl Into<String>,
        original_reference: impl Into<String>,
    ) -> Self {
        let duration = task.params.as_video().and_then(|v| v.duration);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task.id.clone(),
            owner_id: task.owner_id.clone(),
            modality: task.modality(),
            local_reference: local_reference.into(),
            original_reference: original_reference.into(),
            width: None,
            height: None,
            duration,
            prompt: task.prompt.clone(),
            model: task.model.clone(),
            created_at: Utc::now(),
        }
    }

    /// Record media dimensions
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}
