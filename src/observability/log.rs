//! Tracing-based observer that emits structured log events.
//!
//! Uses the existing `tracing` infrastructure so events appear alongside
//! normal application logs, with no extra dependencies. Good for local
//! development and debugging.
use crate::observability::traits::{Observer, ObserverEvent, ObserverMetric};

/// Observer that logs events and metrics via `tracing`.
pub struct LogObserver;

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::ExecutionStart { code_bytes } => {
                tracing::info!(code_bytes, "observer: execution.start");
            }
            ObserverEvent::ExecutionRejected { violation } => {
                tracing::info!(violation = violation.as_str(), "observer: execution.rejected");
            }
            ObserverEvent::ContextProvisioned { context } => {
                tracing::info!(context = context.as_str(), "observer: context.provisioned");
            }
            ObserverEvent::ContextCorrupted { context, reason } => {
                tracing::warn!(
                    context = context.as_str(),
                    reason = reason.as_str(),
                    "observer: context.corrupted"
                );
            }
            ObserverEvent::CleanupFailed { message } => {
                tracing::warn!(error = message.as_str(), "observer: cleanup.failed");
            }
            ObserverEvent::ExecutionEnd { status, duration } => {
                tracing::info!(
                    status = status.as_str(),
                    duration_ms = duration.as_millis() as u64,
                    "observer: execution.end"
                );
            }
            ObserverEvent::Error { component, message } => {
                tracing::warn!(
                    component = component.as_str(),
                    error = message.as_str(),
                    "observer: error"
                );
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::ExecLatency(d) => {
                tracing::debug!(
                    latency_ms = d.as_millis() as u64,
                    "observer: metric.exec_latency"
                );
            }
            ObserverMetric::PoolWait(d) => {
                tracing::debug!(wait_ms = d.as_millis() as u64, "observer: metric.pool_wait");
            }
            ObserverMetric::ActiveContexts(n) => {
                tracing::debug!(active_contexts = n, "observer: metric.active_contexts");
            }
            ObserverMetric::ArtifactsCollected(n) => {
                tracing::debug!(artifacts = n, "observer: metric.artifacts_collected");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
