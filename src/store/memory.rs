//! In-memory task store
//!
//! Reference `TaskStore` implementation backed by a mutex-guarded map.
//! Used by the test suite and by embedders that do not need a database.
//! It enforces the same row-level invariants a production store must:
//! forward-only state transitions, non-decreasing progress, and no
//! overwrite of an in-flight correlation handle.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::BrokerError;
use crate::store::{TaskPatch, TaskStore};
use crate::types::artifact::ResultArtifact;
use crate::types::provider::{Modality, ProviderConfig};
use crate::types::task::{Task, TaskState};

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    providers: Vec<ProviderConfig>,
    artifacts: Vec<ResultArtifact>,
}

/// Mutex-guarded in-memory store
#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a new task after validating its inputs
    pub fn insert_task(&self, task: Task) -> Result<(), BrokerError> {
        task.validate()?;
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Register a provider configuration
    pub fn insert_provider(&self, config: ProviderConfig) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.providers.push(config);
    }

    /// Replace all provider configurations (admin reload)
    pub fn replace_providers(&self, configs: Vec<ProviderConfig>) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.providers = configs;
    }

    /// Snapshot of one task
    pub fn task(&self, id: &str) -> Option<Task> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.tasks.get(id).cloned()
    }

    /// Snapshot of all created artifacts
    pub fn artifacts(&self) -> Vec<ResultArtifact> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.artifacts.clone()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn oldest_pending(&self, limit: usize) -> Result<Vec<Task>, BrokerError> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut pending: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.state == TaskState::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn stale_processing_videos(&self, limit: usize) -> Result<Vec<Task>, BrokerError> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut processing: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| {
                t.state == TaskState::Processing
                    && t.modality() == Modality::Video
                    && t.provider_job_id.is_some()
            })
            .cloned()
            .collect();
        processing.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        processing.truncate(limit);
        Ok(processing)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| BrokerError::StorageError(format!("unknown task '{id}'")))?;

        if let Some(next) = patch.state {
            if next != task.state && !task.state.can_transition_to(next) {
                return Err(BrokerError::StorageError(format!(
                    "illegal transition {} -> {} for task '{id}'",
                    task.state, next
                )));
            }
            task.state = next;
        }
        if let Some(job_id) = patch.provider_job_id {
            if let Some(existing) = &task.provider_job_id
                && *existing != job_id
            {
                return Err(BrokerError::StorageError(format!(
                    "task '{id}' already holds correlation handle '{existing}'"
                )));
            }
            task.provider_job_id = Some(job_id);
        }
        if let Some(progress) = patch.progress {
            task.progress = task.progress.max(progress.min(100));
        }
        if let Some(model) = patch.model {
            task.model = Some(model);
        }
        if let Some(provider) = patch.provider_name {
            task.provider_name = Some(provider);
        }
        if let Some(reference) = patch.result_reference {
            task.result_reference = Some(reference);
        }
        if let Some(kind) = patch.failure {
            task.failure = Some(kind);
        }
        if let Some(message) = patch.error_message {
            task.error_message = Some(message);
        }
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn create_artifact(&self, artifact: ResultArtifact) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.artifacts.push(artifact);
        Ok(())
    }

    async fn enabled_providers(&self, modality: Modality) -> Result<Vec<ProviderConfig>, BrokerError> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(inner
            .providers
            .iter()
            .filter(|p| p.enabled && p.modality == modality)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::types::task::{GenerationParams, ImageParams, TaskKind, VideoParams};
    use chrono::Duration;

    fn image_task(prompt: &str) -> Task {
        Task::new(
            "user-1",
            TaskKind::TextToImage,
            prompt,
            GenerationParams::Image(ImageParams::default()),
        )
        .unwrap()
    }

    fn video_task(prompt: &str) -> Task {
        Task::new(
            "user-1",
            TaskKind::TextToVideo,
            prompt,
            GenerationParams::Video(VideoParams::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_oldest_pending_is_creation_ordered_and_bounded() {
        let store = MemoryTaskStore::new();
        let mut first = image_task("first");
        first.created_at = Utc::now() - Duration::minutes(10);
        let mut second = image_task("second");
        second.created_at = Utc::now() - Duration::minutes(5);
        let third = image_task("third");

        // insertion order deliberately scrambled
        store.insert_task(third.clone()).unwrap();
        store.insert_task(first.clone()).unwrap();
        store.insert_task(second.clone()).unwrap();

        let batch = store.oldest_pending(2).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, first.id);
        assert_eq!(batch[1].id, second.id);
    }

    #[tokio::test]
    async fn test_stale_processing_only_returns_dispatched_videos() {
        let store = MemoryTaskStore::new();

        let processing_image = image_task("image");
        let undispatched_video = video_task("no handle");
        let dispatched_video = video_task("with handle");

        store.insert_task(processing_image.clone()).unwrap();
        store.insert_task(undispatched_video.clone()).unwrap();
        store.insert_task(dispatched_video.clone()).unwrap();

        for id in [
            &processing_image.id,
            &undispatched_video.id,
            &dispatched_video.id,
        ] {
            store
                .update_task(id, TaskPatch::processing(10))
                .await
                .unwrap();
        }
        store
            .update_task(&dispatched_video.id, TaskPatch::default().with_job_id("job-1"))
            .await
            .unwrap();

        let batch = store.stale_processing_videos(10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, dispatched_video.id);
    }

    #[tokio::test]
    async fn test_terminal_states_reject_further_transitions() {
        let store = MemoryTaskStore::new();
        let task = image_task("cat");
        store.insert_task(task.clone()).unwrap();

        store
            .update_task(&task.id, TaskPatch::processing(10))
            .await
            .unwrap();
        store
            .update_task(&task.id, TaskPatch::failed(FailureKind::ProviderRejected, "boom"))
            .await
            .unwrap();

        let err = store
            .update_task(&task.id, TaskPatch::processing(10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("illegal transition"));
    }

    #[tokio::test]
    async fn test_in_flight_handle_cannot_be_overwritten() {
        let store = MemoryTaskStore::new();
        let task = video_task("waves");
        store.insert_task(task.clone()).unwrap();
        store
            .update_task(&task.id, TaskPatch::processing(10))
            .await
            .unwrap();

        store
            .update_task(&task.id, TaskPatch::default().with_job_id("job-1"))
            .await
            .unwrap();
        // idempotent re-write of the same handle is fine
        store
            .update_task(&task.id, TaskPatch::default().with_job_id("job-1"))
            .await
            .unwrap();

        let err = store
            .update_task(&task.id, TaskPatch::default().with_job_id("job-2"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("correlation handle"));
    }

    #[tokio::test]
    async fn test_progress_never_decreases() {
        let store = MemoryTaskStore::new();
        let task = video_task("waves");
        store.insert_task(task.clone()).unwrap();
        store
            .update_task(&task.id, TaskPatch::processing(30))
            .await
            .unwrap();
        store
            .update_task(&task.id, TaskPatch::progress(45))
            .await
            .unwrap();
        // a lower provider-reported value is clamped to the stored one
        store
            .update_task(&task.id, TaskPatch::progress(20))
            .await
            .unwrap();
        assert_eq!(store.task(&task.id).unwrap().progress, 45);
    }
}
