//! Container runtime: the injected isolation substrate.
//!
//! [`ContainerRuntime`] is the seam between the context pool and whatever
//! actually provides isolation. [`DockerRuntime`] is the production
//! implementation: one long-lived container per context, created with its
//! resource ceilings applied, payloads dispatched via `docker exec`, and a
//! hard restart as the kill mechanism when a run must be terminated.
//!
//! Security posture of a provisioned container:
//! - no network (`network_mode: none`)
//! - unprivileged user (`1000:1000`), all capabilities dropped
//! - `no-new-privileges`
//! - memory / CPU-quota / pids ceilings from [`ResourceLimits`]
//! - a per-context host scratch directory bind-mounted at `/workspace`,
//!   the only writable area submitted code can reach

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, RestartContainerOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::HostConfig;
use futures_util::StreamExt;
use uuid::Uuid;

use crate::sandbox::capture::SNIPPET_FILE;
use crate::sandbox::config::{ResourceLimits, SandboxConfig};
use crate::sandbox::error::{Result, SandboxError};
use crate::sandbox::types::{Disposition, RawOutcome};

/// Captured stdout/stderr are each truncated at this size so a snippet
/// cannot exhaust host memory by printing.
const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Host-side handle to one provisioned isolated runtime instance.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    /// Identity of the instance at the substrate (container id).
    pub container_id: String,
    /// Host directory bind-mounted at `/workspace` inside the instance.
    pub scratch_dir: PathBuf,
}

/// Abstraction over the isolation substrate (Docker in production, a fake
/// in tests). The pool owns handles; the runtime owns the instances.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Provision a fresh isolated instance with the given ceilings applied.
    async fn provision(&self, limits: &ResourceLimits) -> Result<ContainerHandle>;

    /// Run the staged snippet inside the instance, bounded by `timeout`.
    /// A breached limit comes back tagged in the outcome's disposition,
    /// never as an `Err`.
    async fn run(&self, handle: &ContainerHandle, timeout: Duration) -> Result<RawOutcome>;

    /// Reap every process left over from the previous run.
    async fn reset(&self, handle: &ContainerHandle) -> Result<()>;

    /// Tear the instance down and release its resources.
    async fn destroy(&self, handle: &ContainerHandle) -> Result<()>;

    /// Backend name for logs and diagnostics.
    fn name(&self) -> &str;
}

/// Connect to the local Docker daemon and verify it responds.
pub async fn connect_docker() -> Result<bollard::Docker> {
    let docker = bollard::Docker::connect_with_local_defaults()
        .map_err(|e| SandboxError::Docker(e.to_string()))?;
    docker
        .ping()
        .await
        .map_err(|e| SandboxError::Docker(format!("daemon not responding: {e}")))?;
    Ok(docker)
}

/// Docker-backed [`ContainerRuntime`].
pub struct DockerRuntime {
    docker: bollard::Docker,
    config: SandboxConfig,
}

impl DockerRuntime {
    pub fn new(docker: bollard::Docker, config: SandboxConfig) -> Self {
        Self { docker, config }
    }

    /// Kill everything inside the container by restarting it. The container
    /// comes back with the same configuration and an empty process table.
    async fn hard_restart(&self, handle: &ContainerHandle) -> Result<()> {
        self.docker
            .restart_container(
                &handle.container_id,
                Some(RestartContainerOptions { t: 0 }),
            )
            .await
            .map_err(|e| SandboxError::Cleanup {
                context: handle.container_id.clone(),
                reason: format!("restart failed: {e}"),
            })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn provision(&self, limits: &ResourceLimits) -> Result<ContainerHandle> {
        let context_id = Uuid::new_v4();
        let scratch_dir = self.config.workspace_root.join(format!("ctx-{context_id}"));
        std::fs::create_dir_all(&scratch_dir)
            .map_err(|e| SandboxError::Provision(format!("scratch dir: {e}")))?;

        let host_config = HostConfig {
            binds: Some(vec![format!("{}:/workspace:rw", scratch_dir.display())]),
            memory: Some(limits.memory_bytes as i64),
            cpu_period: Some(100_000),
            cpu_quota: Some((limits.cpus * 100_000.0) as i64),
            pids_limit: Some(limits.pids as i64),
            network_mode: Some("none".to_string()),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges:true".to_string()]),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(self.config.image.clone()),
            // The container idles; payloads arrive via exec.
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            host_config: Some(host_config),
            user: Some("1000:1000".to_string()),
            working_dir: Some("/workspace".to_string()),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: format!("runcell-ctx-{context_id}"),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| SandboxError::Provision(e.to_string()))?;
        let container_id = response.id;

        if let Err(e) = self
            .docker
            .start_container(&container_id, None::<bollard::query_parameters::StartContainerOptions>)
            .await
        {
            // Don't leak the created-but-unstartable container.
            let _ = self
                .docker
                .remove_container(
                    &container_id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            let _ = std::fs::remove_dir_all(&scratch_dir);
            return Err(SandboxError::Provision(format!("start failed: {e}")));
        }

        tracing::info!(container_id = %container_id, "provisioned execution context");

        Ok(ContainerHandle {
            container_id,
            scratch_dir,
        })
    }

    async fn run(&self, handle: &ContainerHandle, timeout: Duration) -> Result<RawOutcome> {
        let exec = self
            .docker
            .create_exec(
                &handle.container_id,
                CreateExecOptions::<String> {
                    cmd: Some(vec![
                        "python3".to_string(),
                        format!("/workspace/{SNIPPET_FILE}"),
                    ]),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    working_dir: Some("/workspace".to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SandboxError::Docker(format!("create_exec: {e}")))?;

        let mut output = match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| SandboxError::Docker(format!("start_exec: {e}")))?
        {
            StartExecResults::Attached { output, .. } => output,
            StartExecResults::Detached => {
                return Err(SandboxError::Docker("exec started detached".to_string()));
            }
        };

        let mut stdout = String::new();
        let mut stderr = String::new();

        let drained = tokio::time::timeout(timeout, async {
            while let Some(chunk) = output.next().await {
                let chunk = chunk.map_err(|e| SandboxError::Docker(format!("exec stream: {e}")))?;
                match chunk {
                    LogOutput::StdOut { message } => {
                        push_truncated(&mut stdout, &message);
                    }
                    LogOutput::StdErr { message } => {
                        push_truncated(&mut stderr, &message);
                    }
                    _ => {}
                }
            }
            Ok::<(), SandboxError>(())
        })
        .await;

        match drained {
            // Wall-clock breach: the payload is still running. Kill the
            // whole process table before reporting, so nothing survives
            // into the next request.
            Err(_) => {
                self.hard_restart(handle).await?;
                Ok(RawOutcome {
                    stdout,
                    stderr,
                    disposition: Disposition::TimedOut,
                })
            }
            Ok(Err(e)) => Err(e),
            Ok(Ok(())) => {
                let inspect = self
                    .docker
                    .inspect_exec(&exec.id)
                    .await
                    .map_err(|e| SandboxError::Docker(format!("inspect_exec: {e}")))?;
                let exit_code = inspect.exit_code.unwrap_or(-1);
                Ok(RawOutcome {
                    disposition: classify_exit(exit_code, &stderr),
                    stdout,
                    stderr,
                })
            }
        }
    }

    async fn reset(&self, handle: &ContainerHandle) -> Result<()> {
        self.hard_restart(handle).await
    }

    async fn destroy(&self, handle: &ContainerHandle) -> Result<()> {
        if let Err(e) = self
            .docker
            .stop_container(&handle.container_id, Some(StopContainerOptions { t: 5 }))
            .await
        {
            tracing::warn!(
                container_id = %handle.container_id,
                error = %e,
                "failed to stop container (may already be stopped)"
            );
        }

        self.docker
            .remove_container(
                &handle.container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| SandboxError::Docker(format!("remove_container: {e}")))?;

        if let Err(e) = std::fs::remove_dir_all(&handle.scratch_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    scratch = %handle.scratch_dir.display(),
                    error = %e,
                    "failed to remove scratch dir"
                );
            }
        }

        tracing::info!(container_id = %handle.container_id, "destroyed execution context");
        Ok(())
    }

    fn name(&self) -> &str {
        "docker"
    }
}

fn push_truncated(buf: &mut String, bytes: &[u8]) {
    let remaining = MAX_CAPTURE_BYTES.saturating_sub(buf.len());
    if remaining == 0 {
        return;
    }
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= remaining {
        buf.push_str(&text);
    } else {
        let mut taken = 0;
        for ch in text.chars() {
            if taken + ch.len_utf8() > remaining {
                break;
            }
            buf.push(ch);
            taken += ch.len_utf8();
        }
    }
}

/// Map an exec exit to a disposition. 137 is SIGKILL, and with a memory
/// ceiling and no other killer inside the container, that is the cgroup
/// OOM killer. Python reports allocation failure before the kernel kills
/// it as `MemoryError`, and a pids-limit breach surfaces as `EAGAIN` on
/// fork, so both are classified from stderr when the exit is nonzero.
fn classify_exit(exit_code: i64, stderr: &str) -> Disposition {
    if exit_code == 0 {
        return Disposition::Exited(0);
    }
    if exit_code == 137 || stderr.contains("MemoryError") {
        return Disposition::OomKilled;
    }
    if stderr.contains("Resource temporarily unavailable")
        || stderr.contains("BlockingIOError")
    {
        return Disposition::PidLimit;
    }
    Disposition::Exited(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_success() {
        assert_eq!(classify_exit(0, ""), Disposition::Exited(0));
        // A zero exit never reclassifies on stderr content.
        assert_eq!(
            classify_exit(0, "harmless mention of MemoryError"),
            Disposition::Exited(0)
        );
    }

    #[test]
    fn classify_oom() {
        assert_eq!(classify_exit(137, ""), Disposition::OomKilled);
        assert_eq!(
            classify_exit(1, "Traceback ...\nMemoryError"),
            Disposition::OomKilled
        );
    }

    #[test]
    fn classify_pid_limit() {
        assert_eq!(
            classify_exit(1, "BlockingIOError: [Errno 11] Resource temporarily unavailable"),
            Disposition::PidLimit
        );
    }

    #[test]
    fn classify_runtime_error() {
        assert_eq!(
            classify_exit(1, "Traceback ...\nZeroDivisionError: division by zero"),
            Disposition::Exited(1)
        );
    }

    #[test]
    fn push_truncated_caps_output() {
        let mut buf = String::new();
        push_truncated(&mut buf, &vec![b'x'; MAX_CAPTURE_BYTES + 100]);
        assert_eq!(buf.len(), MAX_CAPTURE_BYTES);
        // Further pushes are dropped.
        push_truncated(&mut buf, b"more");
        assert_eq!(buf.len(), MAX_CAPTURE_BYTES);
    }
}
