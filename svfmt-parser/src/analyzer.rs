//! File analyzer: the per-file analysis pipeline.
//!
//!     Owns a text structure and runs lex → context rewrite → view filter →
//!     parse over it, collecting rejected tokens along the way. Errors are
//!     collected, never thrown: a partial syntax tree is always available
//!     and later stages proceed on whatever parsed.

use std::fmt;

use serde::Serialize;

use crate::context::rewrite_tokens;
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::structure::TextStructure;
use crate::token::Token;
use crate::view::{filter_for_syntax, init_view};

/// Analysis phase a rejected token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisPhase {
    Lex,
    Preprocess,
    Parse,
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisPhase::Lex => "lexical",
            AnalysisPhase::Preprocess => "preprocessing",
            AnalysisPhase::Parse => "syntax",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Warning => write!(f, "warning"),
        }
    }
}

/// A token the lexer or parser could not classify or consume.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedToken {
    pub token: Token,
    pub phase: AnalysisPhase,
    pub severity: ErrorSeverity,
    pub explanation: String,
}

/// Result of analyzing one source unit.
pub struct SvAnalyzer {
    structure: TextStructure,
    rejects: Vec<RejectedToken>,
}

impl SvAnalyzer {
    /// Run the full pipeline on `source`.
    pub fn analyze(source: &str) -> Self {
        let lexed = tokenize(source);
        let mut tokens = lexed.tokens;
        let mut rejects: Vec<RejectedToken> = lexed
            .errors
            .iter()
            .map(|&span| RejectedToken {
                token: Token::new(crate::token::TokenKind::ErrorToken, span),
                phase: AnalysisPhase::Lex,
                severity: ErrorSeverity::Error,
                explanation: "unrecognized byte sequence".to_string(),
            })
            .collect();

        let mut view = init_view(&tokens);
        filter_for_syntax(&tokens, &mut view);
        rewrite_tokens(source, &mut tokens, &view);

        let parsed = parse(&tokens, &view);
        rejects.extend(parsed.rejects.into_iter().map(|token| RejectedToken {
            token,
            phase: AnalysisPhase::Parse,
            severity: ErrorSeverity::Error,
            explanation: "unexpected token".to_string(),
        }));

        let mut structure = TextStructure::from_parts(source, tokens, view);
        structure.set_syntax_tree(parsed.root);
        SvAnalyzer { structure, rejects }
    }

    pub fn structure(&self) -> &TextStructure {
        &self.structure
    }

    pub fn structure_mut(&mut self) -> &mut TextStructure {
        &mut self.structure
    }

    pub fn into_structure(self) -> TextStructure {
        self.structure
    }

    pub fn rejects(&self) -> &[RejectedToken] {
        &self.rejects
    }

    pub fn ok(&self) -> bool {
        self.rejects.is_empty()
    }

    /// One-line human-readable message for a rejected token.
    pub fn token_error_message(&self, reject: &RejectedToken, filename: &str) -> String {
        let contents = self.structure.contents();
        let start = reject
            .token
            .span
            .start
            .saturating_sub(self.structure.contents_span().start);
        let pos = self.structure.line_column(start);
        let text = if reject.token.is_eof() {
            "<EOF>"
        } else {
            reject.token.text(contents)
        };
        format!(
            "{}:{}: {} {} at \"{}\": {}",
            filename, pos, reject.phase, reject.severity, text, reject.explanation
        )
    }

    /// Messages for all rejected tokens, in token order.
    pub fn token_error_messages(&self, filename: &str) -> Vec<String> {
        self.rejects
            .iter()
            .map(|r| self.token_error_message(r, filename))
            .collect()
    }
}
