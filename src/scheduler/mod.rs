//! Orchestration Loop
//!
//! The scheduler drives every task through its lifecycle: it claims
//! pending tasks, routes them to a provider, advances state, polls
//! long-running video jobs, and finalizes results through the rehoster.
//!
//! One recurring loop, no worker pool. Tasks within a tick are processed
//! sequentially, so at most one provider call is outstanding per loop
//! iteration. A compare-and-swap guard skips a tick entirely when the
//! previous one is still running, which prevents duplicate dispatch for
//! the same task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::adapters::{self, Invocation, JobStatus, MediaSource};
use crate::error::{BrokerError, FailureKind};
use crate::registry;
use crate::rehost::MediaRehoster;
use crate::store::{TaskPatch, TaskStore};
use crate::types::artifact::ResultArtifact;
use crate::types::task::Task;

/// Progress recorded when a task is claimed
const CLAIMED_PROGRESS: u8 = 10;
/// Progress recorded when an async job is accepted by the provider
const SUBMITTED_PROGRESS: u8 = 30;
/// Ceiling for synthetic progress increments; only a completed result may
/// claim more
const FALLBACK_PROGRESS_CAP: u8 = 90;

/// Tuning knobs for the orchestration loop
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between ticks
    pub tick_interval: Duration,
    /// Pending tasks claimed per tick
    pub pending_batch: usize,
    /// Video jobs polled per tick
    pub poll_batch: usize,
    /// Synthetic progress increment when a provider reports none
    pub progress_step: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            pending_batch: 5,
            poll_batch: 10,
            progress_step: 10,
        }
    }
}

impl SchedulerConfig {
    /// Set the tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the pending batch size
    pub fn with_pending_batch(mut self, batch: usize) -> Self {
        self.pending_batch = batch;
        self
    }

    /// Set the poll batch size
    pub fn with_poll_batch(mut self, batch: usize) -> Self {
        self.poll_batch = batch;
        self
    }
}

/// The generation task scheduler
pub struct GenerationScheduler {
    store: Arc<dyn TaskStore>,
    rehoster: MediaRehoster,
    http: reqwest::Client,
    config: SchedulerConfig,
    tick_running: AtomicBool,
}

impl GenerationScheduler {
    pub fn new(store: Arc<dyn TaskStore>, rehoster: MediaRehoster, config: SchedulerConfig) -> Self {
        Self {
            store,
            rehoster,
            http: reqwest::Client::new(),
            config,
            tick_running: AtomicBool::new(false),
        }
    }

    /// Use a preconfigured HTTP client for provider calls
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Run the loop until the token is cancelled
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("scheduler shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                }
            }
        })
    }

    /// Run one tick: claim pending work, then poll in-flight video jobs.
    ///
    /// Returns `false` when the tick was skipped because the previous one
    /// is still running.
    pub async fn tick(&self) -> bool {
        if self
            .tick_running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::debug!("previous tick still running, skipping");
            return false;
        }

        // Snapshot the poll batch before dispatching so a job submitted in
        // this tick is first polled one tick later, after its submission
        // progress has been observable.
        let poll_batch = self.fetch_poll_batch().await;
        self.dispatch_pending().await;
        self.poll_processing(poll_batch).await;

        self.tick_running.store(false, Ordering::Release);
        true
    }

    /// Claim and dispatch the oldest pending tasks, serially in creation
    /// order. Each task's failure is recorded on that task alone.
    async fn dispatch_pending(&self) {
        let batch = match self.store.oldest_pending(self.config.pending_batch).await {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch pending tasks");
                return;
            }
        };

        for task in batch {
            if let Err(err) = self.process_pending(&task).await {
                self.fail_task(&task.id, &err).await;
            }
        }
    }

    async fn process_pending(&self, task: &Task) -> Result<(), BrokerError> {
        tracing::info!(task = %task.id, kind = ?task.kind, "dispatching task");
        self.store
            .update_task(&task.id, TaskPatch::processing(CLAIMED_PROGRESS))
            .await?;

        let configs = self.store.enabled_providers(task.modality()).await?;
        let hint = task.model.as_deref().or(task.provider_hint.as_deref());
        let Some(config) = registry::select_provider(&configs, task.modality(), hint) else {
            return Err(BrokerError::NoProviderAvailable(format!(
                "no enabled {} provider matches the request",
                task.modality()
            )));
        };

        // Record routing; backfill a model hint from the provider name so
        // the stored record names what likely produced the media.
        let mut effective = task.clone();
        effective.provider_name = Some(config.name.clone());
        let mut routing = TaskPatch::default().with_provider(&config.name);
        if task.model.is_none()
            && let Some(family) = registry::implied_model_family(&config.name)
        {
            routing = routing.with_model(family);
            effective.model = Some(family.to_string());
        }
        self.store.update_task(&task.id, routing).await?;

        let adapter = adapters::adapter_for(config.adapter, &self.http);
        match adapter.invoke(config, &effective).await? {
            Invocation::Completed(result) => {
                self.finalize(&effective, &result.media, result.width, result.height)
                    .await
            }
            Invocation::Submitted(handle) => {
                tracing::info!(
                    task = %task.id,
                    provider = %config.name,
                    job_id = %handle.provider_job_id,
                    "video job submitted"
                );
                self.store
                    .update_task(
                        &task.id,
                        TaskPatch::progress(SUBMITTED_PROGRESS)
                            .with_job_id(handle.provider_job_id),
                    )
                    .await
            }
        }
    }

    /// In-flight video jobs due for a poll, least recently updated first
    async fn fetch_poll_batch(&self) -> Vec<Task> {
        match self
            .store
            .stale_processing_videos(self.config.poll_batch)
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch processing video tasks");
                Vec::new()
            }
        }
    }

    /// Poll in-flight video jobs
    async fn poll_processing(&self, batch: Vec<Task>) {
        for task in batch {
            if let Err(err) = self.poll_video(&task).await {
                self.fail_task(&task.id, &err).await;
            }
        }
    }

    async fn poll_video(&self, task: &Task) -> Result<(), BrokerError> {
        let Some(job_id) = task.provider_job_id.as_deref() else {
            // the store only hands out dispatched tasks; tolerate anyway
            return Ok(());
        };

        // Re-resolve the stored provider against live configuration. A
        // missing match skips this tick instead of failing the task: the
        // configuration may be transiently reloading.
        let configs = self.store.enabled_providers(task.modality()).await?;
        let stored = task.provider_name.as_deref().unwrap_or_default();
        let Some(config) = configs
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(stored))
        else {
            tracing::debug!(
                task = %task.id,
                provider = stored,
                "stored provider not in live configuration, skipping this tick"
            );
            return Ok(());
        };

        let adapter = adapters::adapter_for(config.adapter, &self.http);
        let outcome = adapter.poll(config, job_id).await?;
        match outcome.status {
            JobStatus::Completed => {
                let media = outcome.media.ok_or_else(|| {
                    BrokerError::provider_rejected(
                        &config.name,
                        200,
                        "job reported completed without a result",
                    )
                })?;
                self.finalize(task, &media, outcome.width, outcome.height)
                    .await
            }
            JobStatus::Failed => {
                let message = outcome
                    .error
                    .unwrap_or_else(|| "provider reported failure".to_string());
                tracing::warn!(task = %task.id, provider = %config.name, %message, "video job failed");
                self.store
                    .update_task(
                        &task.id,
                        TaskPatch::failed(FailureKind::ProviderRejected, message),
                    )
                    .await
            }
            JobStatus::Pending => {
                // Prefer the provider's number; otherwise nudge forward so
                // users see movement, capped below completion. The store
                // clamps regressions, keeping progress monotone.
                let next = match outcome.progress {
                    Some(reported) => reported.min(100),
                    None => task
                        .progress
                        .saturating_add(self.config.progress_step)
                        .min(FALLBACK_PROGRESS_CAP),
                };
                self.store
                    .update_task(&task.id, TaskPatch::progress(next))
                    .await
            }
        }
    }

    /// Rehost the produced media, complete the task and materialize its
    /// artifact
    async fn finalize(
        &self,
        task: &Task,
        media: &MediaSource,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<(), BrokerError> {
        let original = media.as_reference();
        let local = self.rehoster.rehost(media, task.modality()).await;

        self.store
            .update_task(&task.id, TaskPatch::completed(&local))
            .await?;

        let mut artifact = ResultArtifact::for_task(task, &local, &original);
        artifact.width = width;
        artifact.height = height;
        self.store.create_artifact(artifact).await?;

        tracing::info!(task = %task.id, reference = %local, "task completed");
        Ok(())
    }

    /// Per-task failure boundary: record the failure on the task record
    /// and keep the batch going
    async fn fail_task(&self, id: &str, err: &BrokerError) {
        tracing::warn!(task = %id, error = %err, "task failed");
        let patch = TaskPatch::failed(err.failure_kind(), err.to_string());
        if let Err(store_err) = self.store.update_task(id, patch).await {
            tracing::error!(task = %id, error = %store_err, "failed to record task failure");
        }
    }
}
