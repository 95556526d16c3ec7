//! Formatter on/off controls embedded in comments.
//!
//!     Comments of the shape `// verilog_format: off` and
//!     `// verilog_format: on` (block-comment forms too, with flexible
//!     whitespace, star padding, and an optional trailing reason after `:`
//!     or `//`) open and close byte ranges that the formatter must emit
//!     verbatim.
//!
//!     An EOL off-marker starts disabling after the newline that ends its
//!     line, so the marker line itself still formats; a block off-marker
//!     starts right after `*/`. An on-marker re-enables at its end (for
//!     the EOL form, after its newline). An unmatched off disables through
//!     end of file. Repeated markers of the same kind are idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use svfmt_parser::{Token, TokenKind};

use crate::position::ByteOffsetSet;

static CONTROL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s*]*verilog_format\s*:\s*(off|on)\s*([:/].*)?$").expect("valid regex")
});

/// The directive in a comment, if any.
fn comment_directive(text: &str) -> Option<&'static str> {
    let body = if let Some(stripped) = text.strip_prefix("//") {
        stripped
    } else if let Some(stripped) = text.strip_prefix("/*") {
        stripped.strip_suffix("*/").unwrap_or(stripped)
    } else {
        return None;
    };
    // Trailing star padding of block comments.
    let body = body.trim_end_matches(['*', ' ', '\t']);
    match CONTROL_RE.captures(body) {
        Some(caps) => match caps.get(1).map(|m| m.as_str()) {
            Some("off") => Some("off"),
            Some("on") => Some("on"),
            _ => None,
        },
        None => None,
    }
}

/// Offset just past the newline following `from`, or `len` when there is
/// none.
fn after_next_newline(source: &str, from: usize) -> usize {
    match source[from..].find('\n') {
        Some(pos) => from + pos + 1,
        None => source.len(),
    }
}

/// Compute the disabled byte ranges implied by format-control comments.
pub fn disable_formatting_ranges(source: &str, tokens: &[Token]) -> ByteOffsetSet {
    let mut ranges = ByteOffsetSet::new();
    let mut disabled_from: Option<usize> = None;

    for token in tokens {
        if !token.kind.is_comment() {
            continue;
        }
        let text = token.text(source);
        match comment_directive(text) {
            Some("off") if disabled_from.is_none() => {
                let start = match token.kind {
                    TokenKind::LineComment => after_next_newline(source, token.span.end),
                    _ => token.span.end,
                };
                disabled_from = Some(start);
            }
            Some("on") => {
                if let Some(start) = disabled_from.take() {
                    let end = match token.kind {
                        TokenKind::LineComment => after_next_newline(source, token.span.end),
                        _ => token.span.end,
                    };
                    ranges.add(start, end);
                }
            }
            _ => {}
        }
    }
    if let Some(start) = disabled_from {
        ranges.add(start, source.len());
    }
    ranges
}
