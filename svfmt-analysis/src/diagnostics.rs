//! Conversion of analysis results to LSP diagnostics and edits.
//!
//!     A deliberately narrow layer: lint violations and rejected tokens
//!     become `lsp_types::Diagnostic`s with line/column ranges from the
//!     text structure's line-column map, and autofix edit sets become
//!     `lsp_types::TextEdit`s. The diagnostic count can be capped by the
//!     caller.

use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, TextEdit};
use svfmt_parser::{ErrorSeverity, RejectedToken, Span, TextStructure};

use crate::violation::{Autofix, LintViolation, Severity};

fn position_at(structure: &TextStructure, offset: usize) -> Position {
    let base = structure.contents_span().start;
    let pos = structure.line_column(offset.saturating_sub(base));
    Position { line: pos.line as u32, character: pos.column as u32 }
}

fn range_for_span(structure: &TextStructure, span: Span) -> Range {
    Range {
        start: position_at(structure, span.start),
        end: position_at(structure, span.end),
    }
}

fn severity_of(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
    }
}

/// Convert one lint violation; a "(fix available)" hint is appended when
/// autofixes exist.
pub fn violation_to_diagnostic(
    structure: &TextStructure,
    violation: &LintViolation,
) -> Diagnostic {
    let fix_hint = if violation.autofixes.is_empty() { "" } else { " (fix available)" };
    let message = if violation.url.is_empty() {
        format!("{}{}", violation.reason, fix_hint)
    } else {
        format!("{} {}{}", violation.reason, violation.url, fix_hint)
    };
    Diagnostic {
        range: range_for_span(structure, violation.token.span),
        severity: Some(severity_of(violation.severity)),
        source: Some(violation.rule_name.clone()),
        message,
        ..Diagnostic::default()
    }
}

/// Convert a rejected token from lexing/parsing.
pub fn rejected_token_to_diagnostic(
    structure: &TextStructure,
    reject: &RejectedToken,
) -> Diagnostic {
    Diagnostic {
        range: range_for_span(structure, reject.token.span),
        severity: Some(match reject.severity {
            ErrorSeverity::Error => DiagnosticSeverity::ERROR,
            ErrorSeverity::Warning => DiagnosticSeverity::WARNING,
        }),
        source: Some("svfmt".to_string()),
        message: format!("{} error: {}", reject.phase, reject.explanation),
        ..Diagnostic::default()
    }
}

/// All diagnostics for one analyzed file. A non-negative `limit` caps the
/// total count.
pub fn create_diagnostics(
    structure: &TextStructure,
    rejects: &[RejectedToken],
    violations: &[LintViolation],
    limit: Option<usize>,
) -> Vec<Diagnostic> {
    let mut result: Vec<Diagnostic> = rejects
        .iter()
        .map(|r| rejected_token_to_diagnostic(structure, r))
        .chain(violations.iter().map(|v| violation_to_diagnostic(structure, v)))
        .collect();
    if let Some(limit) = limit {
        result.truncate(limit);
    }
    result
}

/// Convert an autofix's edits into LSP text edits.
pub fn autofix_to_text_edits(structure: &TextStructure, fix: &Autofix) -> Vec<TextEdit> {
    fix.edits
        .iter()
        .map(|edit| TextEdit {
            range: range_for_span(structure, edit.fragment),
            new_text: edit.replacement.clone(),
        })
        .collect()
}

/// Rejected tokens as a JSON array for tool consumers. The phase strings
/// are stable identifiers; external tools rely on them.
pub fn rejected_tokens_to_json(
    structure: &TextStructure,
    rejects: &[RejectedToken],
    limit: Option<usize>,
) -> serde_json::Value {
    let contents = structure.contents();
    let mut errors = Vec::new();
    for reject in rejects {
        if limit.is_some_and(|l| errors.len() >= l) {
            break;
        }
        let pos = position_at(structure, reject.token.span.start);
        let phase = match reject.phase {
            svfmt_parser::AnalysisPhase::Lex => "lex",
            svfmt_parser::AnalysisPhase::Preprocess => "preprocess",
            svfmt_parser::AnalysisPhase::Parse => "parse",
        };
        errors.push(serde_json::json!({
            "line": pos.line,
            "column": pos.character,
            "text": if reject.token.is_eof() { "" } else { reject.token.text(contents) },
            "phase": phase,
            "message": reject.explanation,
        }));
    }
    serde_json::Value::Array(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::ReplacementEdit;
    use svfmt_parser::{SvAnalyzer, Token, TokenKind};

    fn violation_at(structure: &TextStructure, text: &str) -> LintViolation {
        let contents = structure.contents().to_string();
        let token = structure
            .view_tokens()
            .find(|t| t.text(&contents) == text)
            .copied()
            .expect("token present");
        LintViolation {
            token,
            reason: "flagged".to_string(),
            url: "https://rules/flagged".to_string(),
            rule_name: "flagged-rule".to_string(),
            severity: Severity::Warning,
            autofixes: vec![Autofix {
                description: "drop it".to_string(),
                edits: vec![ReplacementEdit {
                    fragment: token.span,
                    replacement: String::new(),
                }],
            }],
        }
    }

    #[test]
    fn test_violation_positions_and_fix_hint() {
        let analyzer = SvAnalyzer::analyze("wire a;\nwire bad;\n");
        let structure = analyzer.structure();
        let violation = violation_at(structure, "bad");
        let diagnostic = violation_to_diagnostic(structure, &violation);
        assert_eq!(diagnostic.range.start.line, 1);
        assert_eq!(diagnostic.range.start.character, 5);
        assert_eq!(diagnostic.range.end.character, 8);
        assert!(diagnostic.message.ends_with("(fix available)"));
        assert_eq!(diagnostic.source.as_deref(), Some("flagged-rule"));
    }

    #[test]
    fn test_diagnostic_limit() {
        let analyzer = SvAnalyzer::analyze("wire a;\nwire b;\n");
        let structure = analyzer.structure();
        let violations = vec![violation_at(structure, "a"), violation_at(structure, "b")];
        let all = create_diagnostics(structure, &[], &violations, None);
        assert_eq!(all.len(), 2);
        let capped = create_diagnostics(structure, &[], &violations, Some(1));
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_rejected_token_diagnostic() {
        use svfmt_parser::AnalysisPhase;
        let analyzer = SvAnalyzer::analyze("wire w;\n");
        let reject = RejectedToken {
            token: Token::new(TokenKind::ErrorToken, Span::new(0, 4)),
            phase: AnalysisPhase::Lex,
            severity: ErrorSeverity::Error,
            explanation: "unrecognized".to_string(),
        };
        let diagnostic = rejected_token_to_diagnostic(analyzer.structure(), &reject);
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert!(diagnostic.message.contains("lexical"));
    }

    #[test]
    fn test_rejected_tokens_json_shape() {
        let analyzer = SvAnalyzer::analyze("wire \u{7f} w;\n");
        let json = rejected_tokens_to_json(
            analyzer.structure(),
            analyzer.rejects(),
            None,
        );
        let errors = json.as_array().expect("array");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["phase"], "lex");
        assert_eq!(errors[0]["line"], 0);
        assert_eq!(errors[0]["column"], 5);
    }

    #[test]
    fn test_autofix_edits_convert() {
        let analyzer = SvAnalyzer::analyze("wire bad;\n");
        let structure = analyzer.structure();
        let violation = violation_at(structure, "bad");
        let edits = autofix_to_text_edits(structure, &violation.autofixes[0]);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_text, "");
        assert_eq!(edits[0].range.start.character, 5);
    }
}
