//! # Mediabroker - A Media Generation Broker
//!
//! Mediabroker orchestrates media generation across independently
//! configured third-party providers: it picks a provider for each task,
//! invokes it over the provider's own wire protocol, tracks the request
//! through a possibly long-running asynchronous lifecycle, rehosts the
//! produced media into durable local storage, and exposes a stable result
//! record.
//!
#![deny(unsafe_code)]
//! ## Architecture
//!
//! - **Registry** (`registry`): picks a provider for a modality and an
//!   optional model hint, by priority with a fuzzy model match.
//! - **Adapters** (`adapters`): one translator per wire protocol, chosen
//!   by the `AdapterKind` declared on the configuration.
//! - **Rehoster** (`rehost`): downloads (or decodes) results into local
//!   storage; degrades to the original reference instead of failing.
//! - **Store** (`store`): the persistence contract plus an in-memory
//!   reference implementation.
//! - **Scheduler** (`scheduler`): the recurring loop that drives every
//!   task from `Pending` to `Completed` or `Failed`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mediabroker::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryTaskStore::new());
//!     store.insert_provider(
//!         ProviderConfig::new(
//!             "apix-images",
//!             Modality::Image,
//!             AdapterKind::OpenAiImage,
//!             "https://api.apix.example",
//!         )
//!         .with_credential(std::env::var("APIX_API_KEY")?)
//!         .with_model("dall-e-3"),
//!     );
//!
//!     let task = Task::new(
//!         "user-1",
//!         TaskKind::TextToImage,
//!         "a cat reading a newspaper",
//!         GenerationParams::Image(ImageParams::default().with_size("1024x1024")),
//!     )?;
//!     let task_id = task.id.clone();
//!     store.insert_task(task)?;
//!
//!     let rehoster = MediaRehoster::new(
//!         "/var/lib/mediabroker",
//!         "http://localhost:9000/media",
//!         reqwest::Client::new(),
//!     );
//!     let scheduler = Arc::new(GenerationScheduler::new(
//!         store.clone(),
//!         rehoster,
//!         SchedulerConfig::default(),
//!     ));
//!
//!     let cancel = CancellationToken::new();
//!     let handle = scheduler.spawn(cancel.clone());
//!
//!     // ... the user-facing layer polls store.task(&task_id) for progress
//!     cancel.cancel();
//!     handle.await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod error;
pub mod observability;
pub mod registry;
pub mod rehost;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod utils;

pub use error::{BrokerError, ErrorCategory, FailureKind};

/// Common imports for embedding the broker
pub mod prelude {
    pub use crate::adapters::{
        AsyncHandle, Invocation, JobStatus, MediaSource, PollOutcome, ProviderAdapter, SyncResult,
    };
    pub use crate::error::{BrokerError, FailureKind};
    pub use crate::registry::select_provider;
    pub use crate::rehost::MediaRehoster;
    pub use crate::scheduler::{GenerationScheduler, SchedulerConfig};
    pub use crate::store::{MemoryTaskStore, TaskPatch, TaskStore};
    pub use crate::types::{
        AdapterKind, GenerationParams, ImageParams, Modality, ProviderConfig, ResultArtifact,
        Task, TaskKind, TaskState, VideoParams,
    };
}
