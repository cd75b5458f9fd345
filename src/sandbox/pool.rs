//! Execution context pool: owned handles with an explicit state machine.
//!
//! The pool is the only mutable shared structure in the engine. Capacity
//! is a semaphore (at most `max_contexts` leases in flight), the free list
//! is mutex-protected, and every context moves through
//!
//! ```text
//! Provisioning -> Free -> Busy -> Draining -> Free
//!                                     |
//!                                     v
//!                              Corrupted -> Destroyed
//! ```
//!
//! A context whose cleanup fails is corrupted and destroyed. It never
//! re-enters the free list. Its capacity slot is released on destruction,
//! so the next acquire provisions a replacement and a single corruption
//! never shrinks the pool.
//!
//! Waiting for capacity is bounded by the caller-supplied budget (the
//! request's effective timeout): blocked callers time out, they never wait
//! unboundedly.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::observability::{Observer, ObserverEvent, ObserverMetric};
use crate::sandbox::capture;
use crate::sandbox::config::ResourceLimits;
use crate::sandbox::container::{ContainerHandle, ContainerRuntime};
use crate::sandbox::error::{Result, SandboxError};

/// Lifecycle states of one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Provisioning,
    Free,
    Busy,
    Draining,
    Corrupted,
    Destroyed,
}

impl ContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Free => "free",
            Self::Busy => "busy",
            Self::Draining => "draining",
            Self::Corrupted => "corrupted",
            Self::Destroyed => "destroyed",
        }
    }

    fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Provisioning, Self::Free)
                | (Self::Free, Self::Busy)
                | (Self::Busy, Self::Draining)
                | (Self::Draining, Self::Free)
                | (Self::Draining, Self::Corrupted)
                | (Self::Corrupted, Self::Destroyed)
                | (Self::Free, Self::Destroyed)
        )
    }
}

impl std::fmt::Display for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One isolated runtime instance owned by the pool.
#[derive(Debug)]
pub struct ExecutionContext {
    pub id: Uuid,
    pub handle: ContainerHandle,
    pub created_at: DateTime<Utc>,
    state: ContextState,
    runs: u64,
}

impl ExecutionContext {
    fn new(handle: ContainerHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle,
            created_at: Utc::now(),
            state: ContextState::Provisioning,
            runs: 0,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Executions this context has served, including the one in flight.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    fn transition(&mut self, next: ContextState) -> Result<()> {
        if !self.state.can_transition(next) {
            return Err(SandboxError::IllegalState {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        tracing::debug!(context = %self.id, from = %self.state, to = %next, "context transition");
        self.state = next;
        Ok(())
    }
}

/// An acquired context. Exactly one in-flight execution per lease; the
/// capacity permit is held until the pool releases (or destroys) it.
#[derive(Debug)]
pub struct ContextLease {
    ctx: ExecutionContext,
    permit: OwnedSemaphorePermit,
}

impl ContextLease {
    pub fn context_id(&self) -> Uuid {
        self.ctx.id
    }

    pub fn handle(&self) -> &ContainerHandle {
        &self.ctx.handle
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.ctx.handle.scratch_dir
    }
}

/// Fixed-capacity pool of execution contexts with pool-or-create acquire
/// semantics.
pub struct ContextPool {
    runtime: Arc<dyn ContainerRuntime>,
    limits: ResourceLimits,
    max_contexts: usize,
    slots: Arc<Semaphore>,
    free: Mutex<Vec<ExecutionContext>>,
    provisioned_total: AtomicUsize,
    observer: Arc<dyn Observer>,
}

impl ContextPool {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        limits: ResourceLimits,
        max_contexts: usize,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            runtime,
            limits,
            max_contexts,
            slots: Arc::new(Semaphore::new(max_contexts)),
            free: Mutex::new(Vec::new()),
            provisioned_total: AtomicUsize::new(0),
            observer,
        }
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// How many contexts have ever been provisioned.
    pub fn provisioned_total(&self) -> usize {
        self.provisioned_total.load(Ordering::SeqCst)
    }

    /// Contexts currently sitting Free.
    pub async fn free_len(&self) -> usize {
        self.free.lock().await.len()
    }

    /// Wait (bounded by `wait_budget`) for capacity, then hand out a free
    /// context or provision a new one.
    pub async fn acquire(&self, wait_budget: Duration) -> Result<ContextLease> {
        let started = Instant::now();
        let permit = match tokio::time::timeout(wait_budget, self.slots.clone().acquire_owned())
            .await
        {
            Err(_) => return Err(SandboxError::AcquireTimeout),
            Ok(Err(_)) => return Err(SandboxError::PoolClosed),
            Ok(Ok(permit)) => permit,
        };
        self.observer
            .record_metric(&ObserverMetric::PoolWait(started.elapsed()));

        let reused = self.free.lock().await.pop();
        let mut ctx = match reused {
            Some(ctx) => ctx,
            None => {
                let handle = self.runtime.provision(&self.limits).await?;
                self.provisioned_total.fetch_add(1, Ordering::SeqCst);
                let mut ctx = ExecutionContext::new(handle);
                ctx.transition(ContextState::Free)?;
                self.observer.record_event(&ObserverEvent::ContextProvisioned {
                    context: ctx.id.to_string(),
                });
                ctx
            }
        };

        ctx.transition(ContextState::Busy)?;
        ctx.runs += 1;
        self.observer
            .record_metric(&ObserverMetric::ActiveContexts(self.busy_count() as u64));

        Ok(ContextLease { ctx, permit })
    }

    /// Drain and clean a leased context, then return it to the free list.
    /// On cleanup failure the context is corrupted and destroyed; the error
    /// is returned so the caller can log it, but the already-captured
    /// result is unaffected.
    pub async fn release(&self, lease: ContextLease) -> Result<()> {
        let ContextLease { mut ctx, permit } = lease;
        ctx.transition(ContextState::Draining)?;

        match self.clean(&ctx).await {
            Ok(()) => {
                ctx.transition(ContextState::Free)?;
                self.free.lock().await.push(ctx);
                drop(permit);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(context = %ctx.id, error = %e, "cleanup failed, corrupting context");
                self.observer.record_event(&ObserverEvent::ContextCorrupted {
                    context: ctx.id.to_string(),
                    reason: e.to_string(),
                });
                ctx.transition(ContextState::Corrupted)?;
                if let Err(destroy_err) = self.runtime.destroy(&ctx.handle).await {
                    tracing::error!(
                        context = %ctx.id,
                        error = %destroy_err,
                        "failed to destroy corrupted context"
                    );
                }
                ctx.transition(ContextState::Destroyed)?;
                // Dropping the permit frees the slot; the next acquire
                // provisions a replacement.
                drop(permit);
                Err(e)
            }
        }
    }

    async fn clean(&self, ctx: &ExecutionContext) -> Result<()> {
        // Reap processes first so nothing can recreate files after the
        // purge, then verify the scratch area is empty.
        self.runtime.reset(&ctx.handle).await?;
        capture::purge(&ctx.handle.scratch_dir)?;
        Ok(())
    }

    fn busy_count(&self) -> usize {
        self.max_contexts - self.slots.available_permits()
    }

    /// Destroy every pooled context and refuse further acquires.
    pub async fn shutdown(&self) {
        self.slots.close();
        let mut free = self.free.lock().await;
        for mut ctx in free.drain(..) {
            if let Err(e) = self.runtime.destroy(&ctx.handle).await {
                tracing::warn!(context = %ctx.id, error = %e, "destroy failed during shutdown");
            }
            let _ = ctx.transition(ContextState::Destroyed);
        }
    }
}
