//! Library whitelist and forbidden capability tokens.
//!
//! Loaded once at startup (from an operator-maintained JSON file or the
//! built-in defaults) and shared read-only across all concurrent requests.
//! There is no mutation API.
//!
//! Detection is name-based, not behavioral: this is a hardening layer in
//! front of the container, not the isolation boundary itself.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::sandbox::error::{Result, SandboxError};

/// Libraries importable by submitted code when no policy file is supplied.
/// Matches the data-science stack baked into the default runtime image.
const DEFAULT_APPROVED: &[&str] = &[
    "pandas",
    "numpy",
    "openpyxl",
    "xlsxwriter",
    "pypdf",
    "pdfplumber",
    "docx",
    "pptx",
    "PIL",
    "pytesseract",
    "matplotlib",
    "plotly",
    "seaborn",
    "reportlab",
    "json",
    "csv",
    "datetime",
    "re",
    "math",
    "statistics",
    "itertools",
    "collections",
    "io",
];

/// Capability tokens refused anywhere in submitted code: direct OS access,
/// process spawning, dynamic evaluation, and introspection escape hatches.
const DEFAULT_FORBIDDEN: &[&str] = &[
    "os",
    "sys",
    "subprocess",
    "socket",
    "shutil",
    "importlib",
    "ctypes",
    "threading",
    "multiprocessing",
    "eval",
    "exec",
    "compile",
    "__import__",
    "globals",
    "locals",
    "breakpoint",
];

/// On-disk policy file shape.
#[derive(Debug, Deserialize)]
struct PolicyFile {
    approved_libraries: Vec<String>,
    forbidden_tokens: Vec<String>,
}

/// The closed set of approved libraries and forbidden capability tokens.
#[derive(Debug, Clone)]
pub struct PolicySet {
    approved: BTreeSet<String>,
    forbidden: BTreeSet<String>,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::new(
            DEFAULT_APPROVED.iter().map(|s| s.to_string()),
            DEFAULT_FORBIDDEN.iter().map(|s| s.to_string()),
        )
    }
}

impl PolicySet {
    pub fn new(
        approved: impl IntoIterator<Item = String>,
        forbidden: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            approved: approved.into_iter().collect(),
            forbidden: forbidden.into_iter().collect(),
        }
    }

    /// Load a policy from a JSON file:
    /// `{ "approved_libraries": [...], "forbidden_tokens": [...] }`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SandboxError::Policy(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: PolicyFile = serde_json::from_str(&content).map_err(|e| {
            SandboxError::Policy(format!("cannot parse {}: {e}", path.display()))
        })?;
        if file.approved_libraries.is_empty() {
            return Err(SandboxError::Policy(format!(
                "{}: approved_libraries is empty",
                path.display()
            )));
        }
        Ok(Self::new(file.approved_libraries, file.forbidden_tokens))
    }

    /// Whether submitted code may import this library.
    pub fn is_library_approved(&self, name: &str) -> bool {
        self.approved.contains(name)
    }

    /// Whether this identifier is a forbidden capability token.
    pub fn is_forbidden_token(&self, token: &str) -> bool {
        self.forbidden.contains(token)
    }

    /// Every forbidden token appearing as an identifier in the source.
    pub fn violations_in(&self, source: &str) -> BTreeSet<String> {
        identifiers(source)
            .filter(|tok| self.forbidden.contains(*tok))
            .map(str::to_string)
            .collect()
    }

    pub fn approved_len(&self) -> usize {
        self.approved.len()
    }

    pub fn forbidden_len(&self) -> usize {
        self.forbidden.len()
    }
}

/// Iterate identifier-shaped tokens in the source. Splitting on
/// non-identifier characters keeps matching at word boundaries, so `cost`
/// never matches the token `os`.
pub(crate) fn identifiers(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|tok| {
            !tok.is_empty() && !tok.starts_with(|c: char| c.is_ascii_digit())
        })
}
