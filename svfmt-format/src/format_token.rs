//! Pre-format tokens: a token plus the spacing decision to its left.
//!
//!     The annotator fills in `before` for every token; the alignment
//!     engine may later override the spaces, and the wrap search turns the
//!     undecided edges into append-or-wrap choices.

use svfmt_parser::{Span, Token};

/// Constraint on the edge before a token, set by the annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpacingOptions {
    /// The wrap search may choose to append or wrap here.
    #[default]
    Undecided,
    /// No line break permitted before this token.
    MustAppend,
    /// A line break is mandatory before this token.
    MustWrap,
    /// Reproduce the original spacing before this token.
    Preserve,
    /// Spacing is dictated by the alignment engine.
    AppendAligned,
}

/// Decision made for the edge once a line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacingDecision {
    Append,
    Wrap,
    Preserve,
}

/// Group-balance classification of a token for the wrap-column stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBalancing {
    #[default]
    None,
    Open,
    Close,
}

/// Spacing annotation on the edge before a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterTokenInfo {
    pub spaces_required: usize,
    pub break_decision: SpacingOptions,
}

/// One token prepared for formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreFormatToken {
    pub token: Token,
    /// Original whitespace between the previous retained token and this one.
    pub leading_space_span: Span,
    pub before: InterTokenInfo,
    pub break_penalty: i32,
    pub balancing: GroupBalancing,
}

impl PreFormatToken {
    pub fn new(token: Token, leading_space_span: Span) -> Self {
        PreFormatToken {
            token,
            leading_space_span,
            before: InterTokenInfo::default(),
            break_penalty: 1,
            balancing: GroupBalancing::None,
        }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.token.text(source)
    }

    pub fn length(&self) -> usize {
        self.token.span.len()
    }

    /// The original whitespace text before this token.
    pub fn original_leading_spaces<'a>(&self, source: &'a str) -> &'a str {
        &source[self.leading_space_span.as_range()]
    }

    /// Number of leading spaces this token requires under its current
    /// annotation. Preserved edges count the original spacing, measured
    /// from the last newline when one intervenes.
    pub fn leading_spaces_length(&self, source: &str) -> usize {
        match self.before.break_decision {
            SpacingOptions::Preserve => {
                let ws = self.original_leading_spaces(source);
                match ws.rfind('\n') {
                    Some(pos) => ws.len() - pos - 1,
                    None => ws.len(),
                }
            }
            _ => self.before.spaces_required,
        }
    }

    /// Excess of the original spacing over the required flush-left spacing.
    /// Only meaningful when no newline separates the tokens.
    pub fn excess_spaces(&self, source: &str) -> i64 {
        let ws = self.original_leading_spaces(source);
        if ws.contains('\n') {
            return 0;
        }
        ws.len() as i64 - self.before.spaces_required as i64
    }
}

/// Width of a token slice rendered compactly: text lengths plus required
/// spacings, excluding the first token's own leading spaces.
pub fn effective_cell_width(tokens: &[PreFormatToken], source: &str) -> usize {
    if tokens.is_empty() {
        return 0;
    }
    let mut total = 0usize;
    for (i, ftoken) in tokens.iter().enumerate() {
        if i > 0 {
            total += ftoken.leading_spaces_length(source);
        }
        total += ftoken.length();
    }
    total
}

/// Leading border requirement of a token slice.
pub fn effective_left_border_width(tokens: &[PreFormatToken]) -> usize {
    tokens
        .first()
        .map(|t| t.before.spaces_required)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svfmt_parser::TokenKind;

    fn ftoken(source: &str, ws: (usize, usize), tok: (usize, usize), spaces: usize) -> PreFormatToken {
        let _ = source;
        let mut f = PreFormatToken::new(
            Token::new(TokenKind::Identifier, Span::new(tok.0, tok.1)),
            Span::new(ws.0, ws.1),
        );
        f.before.spaces_required = spaces;
        f
    }

    #[test]
    fn test_effective_cell_width_skips_first_border() {
        let source = "ab cd  ef";
        let tokens = vec![
            ftoken(source, (0, 0), (0, 2), 0),
            ftoken(source, (2, 3), (3, 5), 1),
            ftoken(source, (5, 7), (7, 9), 1),
        ];
        // ab + 1 + cd + 1 + ef = 8
        assert_eq!(effective_cell_width(&tokens, source), 8);
        assert_eq!(effective_left_border_width(&tokens), 0);
    }

    #[test]
    fn test_preserved_spacing_counts_original() {
        let source = "a   b";
        let mut f = ftoken(source, (1, 4), (4, 5), 1);
        f.before.break_decision = SpacingOptions::Preserve;
        assert_eq!(f.leading_spaces_length(source), 3);
        f.before.break_decision = SpacingOptions::Undecided;
        assert_eq!(f.leading_spaces_length(source), 1);
    }

    #[test]
    fn test_preserved_spacing_after_newline() {
        let source = "a\n  b";
        let mut f = ftoken(source, (1, 4), (4, 5), 1);
        f.before.break_decision = SpacingOptions::Preserve;
        assert_eq!(f.leading_spaces_length(source), 2);
    }

    #[test]
    fn test_excess_spaces() {
        let source = "a    b";
        let f = ftoken(source, (1, 5), (5, 6), 1);
        assert_eq!(f.excess_spaces(source), 3);
    }
}
