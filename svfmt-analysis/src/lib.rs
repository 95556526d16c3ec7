//! # svfmt-analysis
//!
//! The shipping layer between analysis results and their consumers: the
//! lint-violation/autofix contract (rules themselves are pluggable
//! collaborators), and the narrow conversion of violations and rejected
//! tokens into LSP diagnostics and text edits.

pub mod diagnostics;
pub mod violation;

pub use diagnostics::{
    autofix_to_text_edits, create_diagnostics, rejected_token_to_diagnostic,
    rejected_tokens_to_json, violation_to_diagnostic,
};
pub use violation::{
    apply_autofix, run_lint_rules, Autofix, LintRule, LintViolation, ReplacementEdit, Severity,
};
