//! Error types for the sandbox subsystem.
//!
//! Policy rejections and limit breaches are *not* errors; they are normal
//! outcomes carried in [`crate::sandbox::types::ExecStatus`]. Everything in
//! here is infrastructure: the Docker daemon, the scratch filesystem, the
//! pool. At the `execute` boundary these are logged with detail and surfaced
//! to the caller as an opaque `Fault`.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SandboxError>;

/// Infrastructure error from the sandbox subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Docker error: {0}")]
    Docker(String),

    #[error("Failed to provision execution context: {0}")]
    Provision(String),

    #[error("Failed to stage workspace at {path}: {reason}")]
    Stage { path: PathBuf, reason: String },

    #[error("Invalid input file name: {0}")]
    InvalidInputFile(String),

    #[error("Cleanup failed for context {context}: {reason}")]
    Cleanup { context: String, reason: String },

    #[error("Illegal context state transition: {from} -> {to}")]
    IllegalState {
        from: &'static str,
        to: &'static str,
    },

    #[error("Timed out waiting for a free execution context")]
    AcquireTimeout,

    #[error("Context pool is shut down")]
    PoolClosed,

    #[error("Policy error: {0}")]
    Policy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
