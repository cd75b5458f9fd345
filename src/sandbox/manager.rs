//! Execution orchestrator.
//!
//! [`SandboxManager`] ties the analyzer, the context pool and result
//! capture into the single `execute` entry point. Analysis runs strictly
//! before any context acquisition: code that fails vetting never reaches
//! an isolated runtime, and no resource is provisioned for it.
//!
//! `execute` is total. Policy rejections, timeouts and limit breaches come
//! back as typed statuses; infrastructure failures are logged with detail
//! and surfaced as an opaque `Fault`. Nothing is retried here; retry
//! policy, if any, belongs to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::observability::{NoopObserver, Observer, ObserverEvent, ObserverMetric};
use crate::sandbox::analyzer::{analyze, AnalysisVerdict};
use crate::sandbox::capture;
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::container::ContainerRuntime;
use crate::sandbox::error::SandboxError;
use crate::sandbox::policy::PolicySet;
use crate::sandbox::pool::{ContextLease, ContextPool};
use crate::sandbox::types::{ExecutionRequest, ExecutionResult};

/// Orchestrates vetting, pooled execution and capture for one engine
/// instance. Cheap to share behind an `Arc`; serves any number of
/// concurrent callers.
pub struct SandboxManager {
    policy: Arc<PolicySet>,
    pool: Arc<ContextPool>,
    config: SandboxConfig,
    observer: Arc<dyn Observer>,
}

/// Builder for [`SandboxManager`]. The runtime is the one dependency with
/// no sensible default; everything else falls back to defaults.
pub struct SandboxManagerBuilder {
    runtime: Arc<dyn ContainerRuntime>,
    policy: Arc<PolicySet>,
    config: SandboxConfig,
    observer: Arc<dyn Observer>,
}

impl SandboxManagerBuilder {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            policy: Arc::new(PolicySet::default()),
            config: SandboxConfig::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn policy(mut self, policy: Arc<PolicySet>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(mut self, config: SandboxConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> SandboxManager {
        let pool = Arc::new(ContextPool::new(
            self.runtime,
            self.config.limits.clone(),
            self.config.max_contexts,
            self.observer.clone(),
        ));
        SandboxManager {
            policy: self.policy,
            pool,
            config: self.config,
            observer: self.observer,
        }
    }
}

impl SandboxManager {
    pub fn builder(runtime: Arc<dyn ContainerRuntime>) -> SandboxManagerBuilder {
        SandboxManagerBuilder::new(runtime)
    }

    pub fn policy(&self) -> &PolicySet {
        &self.policy
    }

    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }

    /// Execute one vetted request end to end.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();
        self.observer.record_event(&ObserverEvent::ExecutionStart {
            code_bytes: request.code.len(),
        });

        let timeout = self.config.effective_timeout(request.timeout);

        if let AnalysisVerdict::Fail(violation) = analyze(&request.code, &self.policy) {
            tracing::info!(violation = %violation, "rejected by static analysis");
            self.observer.record_event(&ObserverEvent::ExecutionRejected {
                violation: violation.to_string(),
            });
            return self.finish(ExecutionResult::rejected(violation, started.elapsed()));
        }

        // Waiting for a context counts against the request's own budget.
        let lease = match self.pool.acquire(timeout).await {
            Ok(lease) => lease,
            Err(SandboxError::AcquireTimeout) => {
                tracing::info!("timed out waiting for a free execution context");
                return self.finish(ExecutionResult::timed_out(started.elapsed()));
            }
            Err(e) => {
                tracing::error!(error = %e, "context acquisition failed");
                self.record_error("pool", &e);
                return self.finish(ExecutionResult::fault(started.elapsed()));
            }
        };

        let result = self.run_on(&lease, &request, timeout, started).await;

        // Cleanup runs on every path out of the run, including timeout,
        // limit breach and fault. A failure here corrupts the context but
        // leaves the already-captured result intact.
        if let Err(e) = self.pool.release(lease).await {
            tracing::error!(error = %e, "context cleanup failed");
            self.observer.record_event(&ObserverEvent::CleanupFailed {
                message: e.to_string(),
            });
        }

        self.finish(result)
    }

    async fn run_on(
        &self,
        lease: &ContextLease,
        request: &ExecutionRequest,
        timeout: Duration,
        started: Instant,
    ) -> ExecutionResult {
        if let Err(e) = capture::stage(lease.scratch_dir(), request) {
            tracing::error!(context = %lease.context_id(), error = %e, "staging failed");
            self.record_error("stage", &e);
            return ExecutionResult::fault(started.elapsed());
        }

        // Analysis and pool wait already consumed part of the budget.
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return ExecutionResult::timed_out(started.elapsed());
        }

        let raw = match self.pool.runtime().run(lease.handle(), remaining).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(context = %lease.context_id(), error = %e, "run failed");
                self.record_error("runtime", &e);
                return ExecutionResult::fault(started.elapsed());
            }
        };

        match capture::collect(lease.scratch_dir(), raw, request, started.elapsed()) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(context = %lease.context_id(), error = %e, "capture failed");
                self.record_error("capture", &e);
                ExecutionResult::fault(started.elapsed())
            }
        }
    }

    /// Destroy pooled contexts and refuse further work.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    fn finish(&self, result: ExecutionResult) -> ExecutionResult {
        self.observer.record_event(&ObserverEvent::ExecutionEnd {
            status: result.status.as_str().to_string(),
            duration: result.duration,
        });
        self.observer
            .record_metric(&ObserverMetric::ExecLatency(result.duration));
        if !result.artifacts.is_empty() {
            self.observer
                .record_metric(&ObserverMetric::ArtifactsCollected(
                    result.artifacts.len() as u64
                ));
        }
        result
    }

    fn record_error(&self, component: &str, error: &SandboxError) {
        self.observer.record_event(&ObserverEvent::Error {
            component: component.to_string(),
            message: error.to_string(),
        });
    }
}
