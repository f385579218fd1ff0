//! Task Store
//!
//! The persistence collaborator contract. The scheduler is the sole writer
//! of task state and every mutation funnels through `update_task`, so two
//! code paths can never race to set conflicting terminal states. All
//! operations are expected to be atomic at the row level; the core needs
//! no cross-row transactions.

use async_trait::async_trait;

use crate::error::{BrokerError, FailureKind};
use crate::types::artifact::ResultArtifact;
use crate::types::provider::{Modality, ProviderConfig};
use crate::types::task::{Task, TaskState};

pub mod memory;

pub use memory::MemoryTaskStore;

/// Partial task update applied through the single mutation path
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub state: Option<TaskState>,
    pub progress: Option<u8>,
    pub model: Option<String>,
    pub provider_name: Option<String>,
    pub provider_job_id: Option<String>,
    pub result_reference: Option<String>,
    pub failure: Option<FailureKind>,
    pub error_message: Option<String>,
}

impl TaskPatch {
    /// Mark a task `Processing` at the given progress
    pub fn processing(progress: u8) -> Self {
        Self {
            state: Some(TaskState::Processing),
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// Progress-only update for a still-running job
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// Mark a task `Completed` with its final media reference
    pub fn completed(result_reference: impl Into<String>) -> Self {
        Self {
            state: Some(TaskState::Completed),
            progress: Some(100),
            result_reference: Some(result_reference.into()),
            ..Self::default()
        }
    }

    /// Mark a task `Failed` with a classification and message
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            state: Some(TaskState::Failed),
            failure: Some(kind),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Record the provider the task was dispatched to
    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Record the provider correlation handle
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.provider_job_id = Some(job_id.into());
        self
    }

    /// Record a backfilled model hint
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Durable record of tasks, artifacts and provider configurations
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Oldest `Pending` tasks, creation order, bounded by `limit`
    async fn oldest_pending(&self, limit: usize) -> Result<Vec<Task>, BrokerError>;

    /// `Processing` video tasks holding a correlation handle, least
    /// recently updated first, bounded by `limit`
    async fn stale_processing_videos(&self, limit: usize) -> Result<Vec<Task>, BrokerError>;

    /// Apply a partial update to one task
    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<(), BrokerError>;

    /// Record the durable output of a completed task
    async fn create_artifact(&self, artifact: ResultArtifact) -> Result<(), BrokerError>;

    /// Enabled provider configurations for a modality
    async fn enabled_providers(&self, modality: Modality) -> Result<Vec<ProviderConfig>, BrokerError>;
}
