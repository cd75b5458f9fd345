//! `runcell exec` - run one snippet through the engine and print the result.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sandbox::{ExecutionRequest, ExecutionResult, SandboxManager};

/// Execute a snippet from `file` (or stdin) and print the result as JSON.
pub async fn run_exec_command(
    manager: &SandboxManager,
    file: Option<PathBuf>,
    timeout_secs: Option<u64>,
    inputs: Vec<PathBuf>,
    artifacts_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let code = read_code(file.as_deref())?;

    let mut request = ExecutionRequest::new(code);
    if let Some(secs) = timeout_secs {
        request = request.with_timeout(Duration::from_secs(secs));
    }
    for path in &inputs {
        let name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("input path has no file name: {}", path.display()))?
            .to_string_lossy()
            .to_string();
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("cannot read input {}: {e}", path.display()))?;
        request = request.with_input_file(name, bytes);
    }

    let result = manager.execute(request).await;

    if let Some(dir) = artifacts_dir {
        write_artifacts(&dir, &result)?;
    }

    println!("{}", render(&result)?);
    Ok(())
}

fn read_code(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display())),
        None => {
            let mut code = String::new();
            std::io::stdin().read_to_string(&mut code)?;
            Ok(code)
        }
    }
}

fn write_artifacts(dir: &Path, result: &ExecutionResult) -> anyhow::Result<()> {
    if result.artifacts.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    for artifact in &result.artifacts {
        let path = dir.join(&artifact.name);
        std::fs::write(&path, &artifact.bytes)
            .map_err(|e| anyhow::anyhow!("cannot write artifact {}: {e}", path.display()))?;
        tracing::info!(artifact = %path.display(), "wrote artifact");
    }
    Ok(())
}

fn render(result: &ExecutionResult) -> anyhow::Result<String> {
    let report = serde_json::json!({
        "status": result.status,
        "stdout": result.stdout,
        "stderr": result.stderr,
        "violation": result.violation.as_ref().map(|v| v.to_string()),
        "artifacts": result.artifacts.iter()
            .map(|a| serde_json::json!({"name": a.name, "bytes": a.bytes.len()}))
            .collect::<Vec<_>>(),
        "duration_ms": result.duration.as_millis() as u64,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}
