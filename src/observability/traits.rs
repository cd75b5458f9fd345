//! Core observer trait and event/metric types.
use std::time::Duration;

/// Provider-agnostic observer for engine lifecycle events and metrics.
///
/// Implementations can log to tracing, export to OpenTelemetry, write to
/// Prometheus, or do nothing at all. The engine records events at key
/// lifecycle points and the observer decides what to do with them.
///
/// Thread-safe and cheaply cloneable behind `Arc<dyn Observer>`.
pub trait Observer: Send + Sync {
    /// Record a discrete lifecycle event.
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric sample.
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data (e.g. OTLP batch exporter). No-op by default.
    fn flush(&self) {}

    /// Human-readable backend name (e.g. "noop", "log").
    fn name(&self) -> &str;
}

/// Discrete lifecycle events the engine can emit.
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    /// A request entered the orchestrator.
    ExecutionStart { code_bytes: usize },

    /// Static analysis refused the request.
    ExecutionRejected { violation: String },

    /// A fresh execution context was provisioned.
    ContextProvisioned { context: String },

    /// A context failed cleanup and was removed from the pool.
    ContextCorrupted { context: String, reason: String },

    /// Post-run cleanup failed (the context was corrupted).
    CleanupFailed { message: String },

    /// A request finished with the given status.
    ExecutionEnd { status: String, duration: Duration },

    /// An error occurred in a component.
    Error { component: String, message: String },
}

/// Numeric metric samples.
#[derive(Debug, Clone)]
pub enum ObserverMetric {
    /// End-to-end latency of a single request (histogram-style).
    ExecLatency(Duration),

    /// Time a request spent waiting for a free context.
    PoolWait(Duration),

    /// Number of contexts currently Busy (gauge).
    ActiveContexts(u64),

    /// Artifacts collected from one run.
    ArtifactsCollected(u64),
}
