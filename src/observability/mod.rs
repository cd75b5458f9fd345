//! Observability subsystem: trait-based event and metric recording.
//!
//! The engine emits lifecycle events (execution start/end, rejections,
//! context churn) and gauge samples through a pluggable [`Observer`].
//! Backends:
//!
//! | Backend | Description |
//! |---------|-------------|
//! | `noop`  | Discards everything (default) |
//! | `log`   | Structured events via `tracing` |
//! | `multi` | Fan-out to several backends at once |
//!
//! [`create_observer`] picks the backend from [`ObservabilityConfig`];
//! exporters (OTLP, Prometheus) slot in by implementing [`Observer`].
mod log;
mod multi;
mod noop;
pub mod traits;

use std::sync::Arc;

pub use self::log::LogObserver;
pub use self::multi::MultiObserver;
pub use self::noop::NoopObserver;
pub use self::traits::{Observer, ObserverEvent, ObserverMetric};

/// Configuration for the observability backend.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Backend name: "none", "noop", "log".
    pub backend: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: "none".into(),
        }
    }
}

/// Build the configured observer, ready to share across the engine.
/// Unknown backend names fall back to the noop observer rather than
/// failing startup.
pub fn create_observer(config: &ObservabilityConfig) -> Arc<dyn Observer> {
    match config.backend.as_str() {
        "log" => Arc::new(LogObserver),
        "none" | "noop" => Arc::new(NoopObserver),
        other => {
            tracing::warn!(backend = other, "unknown observability backend, using noop");
            Arc::new(NoopObserver)
        }
    }
}
