//! Core data model for sandboxed execution.

use std::time::Duration;

use serde::Serialize;

/// A request to execute one source snippet.
///
/// Immutable once accepted: the orchestrator never mutates a request, it
/// only reads it while staging and running.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Submitted source text.
    pub code: String,
    /// Files staged into the scratch area before the run.
    pub input_files: Vec<InputFile>,
    /// Wall-clock override; clamped to the configured maximum.
    pub timeout: Option<Duration>,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            input_files: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_input_file(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.input_files.push(InputFile {
            name: name.into(),
            bytes,
        });
        self
    }
}

/// A named file accompanying a request.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A file produced by an execution, collected from the scratch area.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Which resource ceiling an execution breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Memory,
    Processes,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Processes => "processes",
        }
    }
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Completion status of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    /// Ran to completion with exit code 0.
    Success,
    /// Static analysis refused the snippet; nothing was executed.
    Rejected,
    /// Wall-clock limit expired and the run was terminated.
    TimedOut,
    /// A resource ceiling other than wall-clock was breached.
    ResourceExceeded(LimitKind),
    /// The snippet ran but exited nonzero (e.g. an uncaught exception).
    RuntimeError,
    /// Infrastructure failure; details are logged, not exposed.
    Fault,
}

impl ExecStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::TimedOut => "timed_out",
            Self::ResourceExceeded(_) => "resource_exceeded",
            Self::RuntimeError => "runtime_error",
            Self::Fault => "fault",
        }
    }
}

impl std::fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Violation found by static analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// Import of a library outside the approved whitelist.
    UnapprovedImport(String),
    /// A forbidden capability token appeared in the source.
    ForbiddenToken(String),
}

impl Violation {
    /// The offending import or token name.
    pub fn token(&self) -> &str {
        match self {
            Self::UnapprovedImport(name) | Self::ForbiddenToken(name) => name,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnapprovedImport(name) => write!(f, "unapproved import '{name}'"),
            Self::ForbiddenToken(token) => write!(f, "forbidden construct '{token}'"),
        }
    }
}

/// How a run inside a context ended, as reported by the driver.
///
/// Limit breaches are tagged individually, never conflated into a generic
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The payload exited on its own with this code.
    Exited(i64),
    /// The wall-clock limit expired and the payload was killed.
    TimedOut,
    /// The memory ceiling was breached.
    OomKilled,
    /// The process-count ceiling was breached.
    PidLimit,
}

/// Raw output of one run, before normalization by result capture.
#[derive(Debug, Clone)]
pub struct RawOutcome {
    pub stdout: String,
    pub stderr: String,
    pub disposition: Disposition,
}

/// Normalized result returned to the caller.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub artifacts: Vec<Artifact>,
    pub status: ExecStatus,
    /// Set when `status` is `Rejected`; names the offending construct.
    pub violation: Option<Violation>,
    pub duration: Duration,
}

impl ExecutionResult {
    fn empty(status: ExecStatus, duration: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            artifacts: Vec::new(),
            status,
            violation: None,
            duration,
        }
    }

    /// Result for a snippet refused by static analysis.
    pub fn rejected(violation: Violation, duration: Duration) -> Self {
        Self {
            violation: Some(violation),
            ..Self::empty(ExecStatus::Rejected, duration)
        }
    }

    /// Result for a request that exhausted its wall-clock budget.
    pub fn timed_out(duration: Duration) -> Self {
        Self::empty(ExecStatus::TimedOut, duration)
    }

    /// Opaque result for an internal failure.
    pub fn fault(duration: Duration) -> Self {
        Self::empty(ExecStatus::Fault, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_as_str_covers_all_variants() {
        assert_eq!(ExecStatus::Success.as_str(), "success");
        assert_eq!(ExecStatus::Rejected.as_str(), "rejected");
        assert_eq!(ExecStatus::TimedOut.as_str(), "timed_out");
        assert_eq!(
            ExecStatus::ResourceExceeded(LimitKind::Memory).as_str(),
            "resource_exceeded"
        );
        assert_eq!(ExecStatus::RuntimeError.as_str(), "runtime_error");
        assert_eq!(ExecStatus::Fault.as_str(), "fault");
    }

    #[test]
    fn violation_display_names_the_offender() {
        let v = Violation::UnapprovedImport("os".into());
        assert_eq!(v.to_string(), "unapproved import 'os'");
        assert_eq!(v.token(), "os");

        let v = Violation::ForbiddenToken("eval".into());
        assert_eq!(v.to_string(), "forbidden construct 'eval'");
        assert_eq!(v.token(), "eval");
    }

    #[test]
    fn rejected_result_carries_the_violation() {
        let r = ExecutionResult::rejected(
            Violation::ForbiddenToken("exec".into()),
            Duration::from_millis(1),
        );
        assert_eq!(r.status, ExecStatus::Rejected);
        assert_eq!(r.violation.as_ref().map(|v| v.token()), Some("exec"));
        assert!(r.stdout.is_empty());
        assert!(r.artifacts.is_empty());
    }

    #[test]
    fn request_builder_accumulates_inputs() {
        let req = ExecutionRequest::new("print(1)")
            .with_timeout(Duration::from_secs(5))
            .with_input_file("data.csv", b"a,b\n".to_vec());
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
        assert_eq!(req.input_files.len(), 1);
        assert_eq!(req.input_files[0].name, "data.csv");
    }
}
