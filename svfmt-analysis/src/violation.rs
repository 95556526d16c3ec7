//! Lint violation and autofix contract.
//!
//!     Lint rules are external collaborators: pluggable functions over the
//!     text structure. This module only defines the records they return
//!     and ships them through, preserving fragment-to-buffer identity —
//!     every autofix edit names a byte range of the analyzed buffer, which
//!     identifies both position and length.

use serde::Serialize;
use svfmt_parser::{Span, TextStructure, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

/// One replacement of a buffer fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementEdit {
    /// Substring of the analyzed buffer being replaced.
    pub fragment: Span,
    pub replacement: String,
}

/// A named, self-contained set of edits fixing one violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Autofix {
    pub description: String,
    pub edits: Vec<ReplacementEdit>,
}

/// One lint finding.
#[derive(Debug, Clone, Serialize)]
pub struct LintViolation {
    pub token: Token,
    pub reason: String,
    pub url: String,
    pub rule_name: String,
    pub severity: Severity,
    pub autofixes: Vec<Autofix>,
}

/// A lint rule: examines the text structure, returns its findings.
pub trait LintRule {
    fn name(&self) -> &str;
    fn check(&self, structure: &TextStructure) -> Vec<LintViolation>;
}

/// Run a set of rules over one text structure; findings are concatenated
/// and sorted by token offset.
pub fn run_lint_rules(
    structure: &TextStructure,
    rules: &[Box<dyn LintRule>],
) -> Vec<LintViolation> {
    let mut violations = Vec::new();
    for rule in rules {
        violations.extend(rule.check(structure));
    }
    violations.sort_by_key(|v| v.token.span.start);
    violations
}

/// Apply one autofix to a copy of the buffer. Edits must be sorted,
/// non-overlapping, and lie within the buffer; otherwise `None`.
pub fn apply_autofix(contents: &str, fix: &Autofix) -> Option<String> {
    let mut result = String::with_capacity(contents.len());
    let mut cursor = 0usize;
    for edit in &fix.edits {
        if edit.fragment.start < cursor || edit.fragment.end > contents.len() {
            return None;
        }
        result.push_str(&contents[cursor..edit.fragment.start]);
        result.push_str(&edit.replacement);
        cursor = edit.fragment.end;
    }
    result.push_str(&contents[cursor..]);
    Some(result)
}
