//! Sandbox configuration and resource ceilings.

use std::path::PathBuf;
use std::time::Duration;

/// Resource ceilings applied to every execution context.
///
/// Memory and process-count breaches terminate the run and are reported as
/// `ResourceExceeded`. The CPU quota throttles rather than terminates; the
/// wall-clock timeout is the terminating bound for CPU abuse.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Memory ceiling in bytes.
    pub memory_bytes: u64,
    /// CPU quota in whole-CPU units (1.0 = one full core).
    pub cpus: f64,
    /// Maximum concurrent processes/threads inside the context.
    pub pids: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: 512 * 1024 * 1024,
            cpus: 1.0,
            pids: 64,
        }
    }
}

/// Configuration for the sandbox subsystem.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Image the runtime provisions contexts from.
    pub image: String,
    /// Maximum number of simultaneously provisioned contexts.
    pub max_contexts: usize,
    /// Host directory under which per-context scratch areas are created.
    pub workspace_root: PathBuf,
    /// Wall-clock budget when a request carries no override.
    pub default_timeout: Duration,
    /// Hard cap on any requested timeout override.
    pub max_timeout: Duration,
    /// Ceilings applied to each context at provision time.
    pub limits: ResourceLimits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "runcell-python:latest".to_string(),
            max_contexts: 4,
            workspace_root: std::env::temp_dir().join("runcell"),
            default_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(90),
            limits: ResourceLimits::default(),
        }
    }
}

impl SandboxConfig {
    /// Resolve a request's timeout: the override if given, clamped to
    /// `max_timeout`; otherwise the default. An oversized override is
    /// clamped, not rejected.
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(t) => t.min(self.max_timeout),
            None => self.default_timeout.min(self.max_timeout),
        }
    }
}
