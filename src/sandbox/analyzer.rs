//! Static safety analysis of submitted source text.
//!
//! Pure text inspection: nothing in this module ever executes submitted
//! code, and a single bounded pass over the source is all it costs. The
//! scan is deliberately conservative: a forbidden token inside a string
//! literal still rejects, because erring toward rejection beats a silent
//! escape.
//!
//! A FAIL verdict is a normal, reportable outcome (the caller sees a
//! `Rejected` result naming the offending construct), not an error.

use crate::sandbox::policy::{identifiers, PolicySet};
use crate::sandbox::types::Violation;

/// Outcome of static analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisVerdict {
    Pass,
    Fail(Violation),
}

impl AnalysisVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Vet one snippet against the policy. Import statements are checked
/// against the whitelist first, then every identifier in the source is
/// checked against the forbidden-token set. The first violation found
/// short-circuits.
pub fn analyze(source: &str, policy: &PolicySet) -> AnalysisVerdict {
    for line in source.lines() {
        if let Some(violation) = check_import_line(line, policy) {
            return AnalysisVerdict::Fail(violation);
        }
    }

    for token in identifiers(source) {
        if policy.is_forbidden_token(token) {
            return AnalysisVerdict::Fail(Violation::ForbiddenToken(token.to_string()));
        }
    }

    AnalysisVerdict::Pass
}

/// Check one line for `import a, b` / `from a.b import c` statements and
/// return the first unapproved root module. Only the first dotted segment
/// is checked: approving `matplotlib` approves `matplotlib.pyplot`.
fn check_import_line(line: &str, policy: &PolicySet) -> Option<Violation> {
    let trimmed = line.trim_start();

    if let Some(rest) = trimmed.strip_prefix("import ") {
        for part in rest.split(',') {
            let name = part.split_whitespace().next()?;
            let root = root_module(name);
            if !root.is_empty() && !policy.is_library_approved(root) {
                return Some(Violation::UnapprovedImport(root.to_string()));
            }
        }
    } else if let Some(rest) = trimmed.strip_prefix("from ") {
        let name = rest.split_whitespace().next()?;
        let root = root_module(name);
        if !root.is_empty() && !policy.is_library_approved(root) {
            return Some(Violation::UnapprovedImport(root.to_string()));
        }
    }

    None
}

fn root_module(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::types::Violation;

    fn verdict(source: &str) -> AnalysisVerdict {
        analyze(source, &PolicySet::default())
    }

    #[test]
    fn clean_snippet_passes() {
        assert!(verdict("print(1+1)").is_pass());
    }

    #[test]
    fn approved_imports_pass() {
        let source = "import pandas\nimport numpy as np\nfrom datetime import date\n";
        assert!(verdict(source).is_pass());
    }

    #[test]
    fn dotted_import_checks_root_module() {
        assert!(verdict("import matplotlib.pyplot as plt").is_pass());
        assert_eq!(
            verdict("import os.path"),
            AnalysisVerdict::Fail(Violation::UnapprovedImport("os".into()))
        );
    }

    #[test]
    fn unapproved_import_names_the_library() {
        assert_eq!(
            verdict("import os"),
            AnalysisVerdict::Fail(Violation::UnapprovedImport("os".into()))
        );
        assert_eq!(
            verdict("import requests"),
            AnalysisVerdict::Fail(Violation::UnapprovedImport("requests".into()))
        );
    }

    #[test]
    fn from_import_is_checked() {
        assert_eq!(
            verdict("from subprocess import run"),
            AnalysisVerdict::Fail(Violation::UnapprovedImport("subprocess".into()))
        );
    }

    #[test]
    fn multi_import_checks_every_name() {
        assert_eq!(
            verdict("import json, socket"),
            AnalysisVerdict::Fail(Violation::UnapprovedImport("socket".into()))
        );
    }

    #[test]
    fn indented_import_is_checked() {
        let source = "def f():\n    import os\n";
        assert_eq!(
            verdict(source),
            AnalysisVerdict::Fail(Violation::UnapprovedImport("os".into()))
        );
    }

    #[test]
    fn forbidden_token_rejects_despite_valid_surroundings() {
        let source = "import pandas\nx = 1\ny = eval('x + 1')\n";
        assert_eq!(
            verdict(source),
            AnalysisVerdict::Fail(Violation::ForbiddenToken("eval".into()))
        );
    }

    #[test]
    fn dunder_import_token_rejects() {
        assert_eq!(
            verdict("__import__('os')"),
            AnalysisVerdict::Fail(Violation::ForbiddenToken("__import__".into()))
        );
    }

    #[test]
    fn token_in_string_literal_still_rejects() {
        // Conservative by design: no attempt to distinguish literals.
        assert!(!verdict("s = 'subprocess'").is_pass());
    }

    #[test]
    fn identifier_substrings_do_not_reject() {
        assert!(verdict("cost = 2\nsystem_total = cost * 2").is_pass());
    }

    #[test]
    fn commented_import_passes_line_check() {
        // A commented-out import is not an import statement; the token scan
        // still sees the identifier, so the conservative outcome is FAIL.
        assert!(!verdict("# import os").is_pass());
    }

    #[test]
    fn empty_source_passes() {
        assert!(verdict("").is_pass());
    }
}
