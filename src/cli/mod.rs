//! CLI command handling.
//!
//! Provides subcommands for:
//! - Executing a snippet through the engine (`exec`)
//! - Probing Docker and configuration health (`doctor`)
//!
//! This is boundary plumbing around [`crate::sandbox::SandboxManager`];
//! transport framing and authentication live outside this repository.

mod doctor;
mod exec;

pub use doctor::run_doctor_command;
pub use exec::run_exec_command;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "runcell")]
#[command(about = "Execute untrusted code snippets in pooled Docker sandboxes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a snippet from a file (reads stdin when omitted)
    Exec {
        /// Path to the snippet file
        file: Option<PathBuf>,

        /// Wall-clock timeout in seconds (clamped to the configured maximum)
        #[arg(long)]
        timeout: Option<u64>,

        /// Input file(s) staged into the scratch area before the run
        #[arg(long)]
        input: Vec<PathBuf>,

        /// Write produced artifacts into this directory
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
    },

    /// Probe Docker, the runtime image and the policy for problems
    Doctor,
}
