//! Staging, result capture, and scratch-area cleanup.
//!
//! The scratch area is the per-context host directory mounted at
//! `/workspace`. Staging writes the snippet and any input files into it;
//! capture normalizes the raw outcome and gathers produced files; purge
//! empties it and verifies emptiness, so the next request starts from a
//! provably clean workspace.

use std::path::Path;

use crate::sandbox::error::{Result, SandboxError};
use crate::sandbox::types::{
    Artifact, Disposition, ExecStatus, ExecutionRequest, ExecutionResult, LimitKind, RawOutcome,
};

/// File name the snippet is staged under (and the exec entrypoint).
pub const SNIPPET_FILE: &str = "main.py";

/// Write the snippet and input files into the scratch area.
///
/// Input names are validated before anything is written: a traversal in
/// file three of five must not leave files one and two behind.
pub fn stage(scratch: &Path, request: &ExecutionRequest) -> Result<()> {
    for file in &request.input_files {
        validate_input_name(&file.name)?;
    }

    let write = |name: &str, bytes: &[u8]| -> Result<()> {
        let path = scratch.join(name);
        std::fs::write(&path, bytes).map_err(|e| SandboxError::Stage {
            path,
            reason: e.to_string(),
        })
    };

    write(SNIPPET_FILE, request.code.as_bytes())?;
    for file in &request.input_files {
        write(&file.name, &file.bytes)?;
    }
    Ok(())
}

fn validate_input_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == SNIPPET_FILE
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.');
    if bad {
        return Err(SandboxError::InvalidInputFile(name.to_string()));
    }
    Ok(())
}

/// Normalize a raw outcome into the caller-facing result: classify the
/// disposition and gather produced artifacts from the scratch area.
pub fn collect(
    scratch: &Path,
    raw: RawOutcome,
    request: &ExecutionRequest,
    duration: std::time::Duration,
) -> Result<ExecutionResult> {
    let status = match raw.disposition {
        Disposition::Exited(0) => ExecStatus::Success,
        Disposition::Exited(_) => ExecStatus::RuntimeError,
        Disposition::TimedOut => ExecStatus::TimedOut,
        Disposition::OomKilled => ExecStatus::ResourceExceeded(LimitKind::Memory),
        Disposition::PidLimit => ExecStatus::ResourceExceeded(LimitKind::Processes),
    };

    Ok(ExecutionResult {
        stdout: raw.stdout,
        stderr: raw.stderr,
        artifacts: collect_artifacts(scratch, request)?,
        status,
        violation: None,
        duration,
    })
}

/// Every regular file in the scratch area except the staged snippet and
/// input files the run left unmodified.
fn collect_artifacts(scratch: &Path, request: &ExecutionRequest) -> Result<Vec<Artifact>> {
    if !scratch.exists() {
        return Ok(Vec::new());
    }

    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(scratch)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name == SNIPPET_FILE {
            continue;
        }
        let bytes = std::fs::read(entry.path())?;
        let unchanged_input = request
            .input_files
            .iter()
            .any(|f| f.name == name && f.bytes == bytes);
        if unchanged_input {
            continue;
        }
        artifacts.push(Artifact { name, bytes });
    }

    artifacts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(artifacts)
}

/// Empty the scratch area and verify it is actually empty afterwards.
/// Any failure here corrupts the owning context; it must not be reused.
pub fn purge(scratch: &Path) -> Result<()> {
    let fail = |reason: String| SandboxError::Cleanup {
        context: scratch.display().to_string(),
        reason,
    };

    if !scratch.exists() {
        return Err(fail("scratch dir is missing".to_string()));
    }

    for entry in std::fs::read_dir(scratch).map_err(|e| fail(e.to_string()))? {
        let entry = entry.map_err(|e| fail(e.to_string()))?;
        let path = entry.path();
        let removed = if entry.file_type().map_err(|e| fail(e.to_string()))?.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        removed.map_err(|e| fail(format!("{}: {e}", path.display())))?;
    }

    let residue = std::fs::read_dir(scratch)
        .map_err(|e| fail(e.to_string()))?
        .next();
    if residue.is_some() {
        return Err(fail("filesystem residue after purge".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::types::ExecutionRequest;
    use std::time::Duration;

    fn raw(disposition: Disposition) -> RawOutcome {
        RawOutcome {
            stdout: "out".into(),
            stderr: "err".into(),
            disposition,
        }
    }

    #[test]
    fn stage_writes_snippet_and_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExecutionRequest::new("print('hi')")
            .with_input_file("data.csv", b"a,b\n".to_vec());

        stage(dir.path(), &req).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join(SNIPPET_FILE)).unwrap(),
            "print('hi')"
        );
        assert_eq!(
            std::fs::read(dir.path().join("data.csv")).unwrap(),
            b"a,b\n"
        );
    }

    #[test]
    fn stage_rejects_traversal_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../evil", "a/b", "..", ".hidden", "", SNIPPET_FILE] {
            let req = ExecutionRequest::new("x").with_input_file(name, vec![]);
            let err = stage(dir.path(), &req).unwrap_err();
            assert!(
                matches!(err, SandboxError::InvalidInputFile(_)),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn stage_validates_before_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExecutionRequest::new("x")
            .with_input_file("ok.txt", b"1".to_vec())
            .with_input_file("../evil", vec![]);

        stage(dir.path(), &req).unwrap_err();
        assert!(!dir.path().join("ok.txt").exists());
        assert!(!dir.path().join(SNIPPET_FILE).exists());
    }

    #[test]
    fn collect_classifies_dispositions() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExecutionRequest::new("x");
        let d = Duration::from_millis(10);

        let cases = [
            (Disposition::Exited(0), ExecStatus::Success),
            (Disposition::Exited(1), ExecStatus::RuntimeError),
            (Disposition::TimedOut, ExecStatus::TimedOut),
            (
                Disposition::OomKilled,
                ExecStatus::ResourceExceeded(LimitKind::Memory),
            ),
            (
                Disposition::PidLimit,
                ExecStatus::ResourceExceeded(LimitKind::Processes),
            ),
        ];
        for (disposition, expected) in cases {
            let result = collect(dir.path(), raw(disposition), &req, d).unwrap();
            assert_eq!(result.status, expected);
            assert_eq!(result.stdout, "out");
        }
    }

    #[test]
    fn collect_gathers_produced_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExecutionRequest::new("x").with_input_file("in.txt", b"input".to_vec());
        stage(dir.path(), &req).unwrap();

        // Simulate the run producing one file and leaving the input alone.
        std::fs::write(dir.path().join("report.txt"), b"result").unwrap();

        let result = collect(dir.path(), raw(Disposition::Exited(0)), &req, Duration::ZERO).unwrap();
        let names: Vec<_> = result.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["report.txt"]);
        assert_eq!(result.artifacts[0].bytes, b"result");
    }

    #[test]
    fn collect_includes_modified_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExecutionRequest::new("x").with_input_file("in.txt", b"before".to_vec());
        stage(dir.path(), &req).unwrap();

        std::fs::write(dir.path().join("in.txt"), b"after").unwrap();

        let result = collect(dir.path(), raw(Disposition::Exited(0)), &req, Duration::ZERO).unwrap();
        let names: Vec<_> = result.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["in.txt"]);
    }

    #[test]
    fn purge_empties_scratch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), b"2").unwrap();

        purge(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn purge_fails_when_scratch_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let err = purge(&gone).unwrap_err();
        assert!(matches!(err, SandboxError::Cleanup { .. }));
    }

    #[test]
    fn purge_is_idempotent_on_empty_scratch() {
        let dir = tempfile::tempdir().unwrap();
        purge(dir.path()).unwrap();
        purge(dir.path()).unwrap();
    }
}
