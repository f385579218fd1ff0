//! Observability helpers
//!
//! The broker logs through `tracing` everywhere; this module only wires a
//! default subscriber for binaries and examples that have none of their
//! own. Libraries embedding the broker should install their own
//! subscriber and skip this.

use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber.
///
/// `RUST_LOG` wins when set; `default_filter` (e.g. `"mediabroker=info"`)
/// applies otherwise. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
