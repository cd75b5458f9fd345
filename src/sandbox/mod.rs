//! Sandboxed execution of untrusted code snippets.
//!
//! This module is the engine core: it vets submitted source against a
//! capability policy, dispatches it into a pooled, resource-bounded Docker
//! container, and captures the result with guaranteed cleanup.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        SandboxManager                          │
//! │                                                                │
//! │   request ──▶ analyzer ──▶ pool.acquire ──▶ stage ──▶ run      │
//! │                  │                                     │       │
//! │               Rejected                              capture    │
//! │            (no context is                              │       │
//! │             ever acquired)                          release    │
//! │                                                  (purge+reset) │
//! └────────────────────────────────────────────────────────────────┘
//!         │                     │                        │
//!         ▼                     ▼                        ▼
//!   ┌───────────┐       ┌──────────────┐        ┌─────────────────┐
//!   │ PolicySet │       │ ContextPool  │        │ ContainerRuntime│
//!   │ whitelist │       │ Free/Busy    │        │ (Docker via     │
//!   │ + tokens  │       │ state machine│        │  bollard)       │
//!   └───────────┘       └──────────────┘        └─────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - **Vet before provision**: code that fails static analysis never
//!   reaches an isolated runtime; rejection allocates nothing.
//! - **One execution per context at a time**: a context is handed out only
//!   while Free, and returns to Free only after output is drained and the
//!   scratch area is verifiably empty.
//! - **Tagged limit breaches**: wall-clock, memory and process-count
//!   breaches terminate the run and are reported individually, never as a
//!   generic failure.
//! - **Corruption never spreads**: a context whose cleanup fails is
//!   destroyed, not reused, and its capacity slot is replaced.
//!
//! The static analyzer is a hardening layer, not the isolation boundary.
//! Real containment comes from the container's namespaces and cgroup
//! ceilings; the analyzer just refuses the obvious escapes early.

pub mod analyzer;
pub mod capture;
pub mod config;
pub mod container;
pub mod error;
pub mod manager;
pub mod policy;
pub mod pool;
pub mod types;

pub use analyzer::{analyze, AnalysisVerdict};
pub use config::{ResourceLimits, SandboxConfig};
pub use container::{connect_docker, ContainerHandle, ContainerRuntime, DockerRuntime};
pub use error::{Result, SandboxError};
pub use manager::{SandboxManager, SandboxManagerBuilder};
pub use policy::PolicySet;
pub use pool::{ContextLease, ContextPool, ContextState, ExecutionContext};
pub use types::{
    Artifact, Disposition, ExecStatus, ExecutionRequest, ExecutionResult, InputFile, LimitKind,
    RawOutcome, Violation,
};
