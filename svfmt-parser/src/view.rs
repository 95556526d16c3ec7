//! Filtered views over a token sequence.
//!
//!     A view is a strictly increasing list of indices into the owning token
//!     sequence. The parser consumes a view with whitespace and comments
//!     dropped; other consumers may filter further. Filtering is in-place
//!     and idempotent, and never reorders surviving entries.

use crate::token::Token;

/// Indices into a token sequence, strictly increasing.
///
/// The view never includes the terminating EOF token; consumers that need
/// the sentinel go back to the sequence itself.
pub type TokenStreamView = Vec<usize>;

/// Build the initial view over `tokens`: every non-EOF token.
pub fn init_view(tokens: &[Token]) -> TokenStreamView {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_eof())
        .map(|(i, _)| i)
        .collect()
}

/// Restrict `view` in place to entries whose token satisfies `keep`.
pub fn filter_view_in_place<F>(tokens: &[Token], view: &mut TokenStreamView, keep: F)
where
    F: Fn(&Token) -> bool,
{
    view.retain(|&i| keep(&tokens[i]));
}

/// The standard pre-parse filter: drop whitespace and comments.
pub fn filter_for_syntax(tokens: &[Token], view: &mut TokenStreamView) {
    filter_view_in_place(tokens, view, |t| !t.kind.is_trivia());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::token::TokenKind;

    #[test]
    fn test_init_view_excludes_eof() {
        let lexed = tokenize("a b");
        let view = init_view(&lexed.tokens);
        assert_eq!(view, vec![0, 1, 2]);
        assert_eq!(lexed.tokens.len(), 4); // a, ws, b, EOF
    }

    #[test]
    fn test_filter_is_idempotent_and_ordered() {
        let lexed = tokenize("a /* c */ b // d");
        let mut view = init_view(&lexed.tokens);
        filter_for_syntax(&lexed.tokens, &mut view);
        let once = view.clone();
        filter_for_syntax(&lexed.tokens, &mut view);
        assert_eq!(view, once);
        assert!(view.windows(2).all(|w| w[0] < w[1]));
        for &i in &view {
            assert!(!lexed.tokens[i].kind.is_trivia());
        }
        let kinds: Vec<TokenKind> = view.iter().map(|&i| lexed.tokens[i].kind).collect();
        assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Identifier]);
    }

    #[test]
    fn test_successive_filters_compose() {
        let lexed = tokenize("a ; b ; c");
        let mut view = init_view(&lexed.tokens);
        filter_for_syntax(&lexed.tokens, &mut view);
        filter_view_in_place(&lexed.tokens, &mut view, |t| {
            t.kind != TokenKind::Semicolon
        });
        let kinds: Vec<TokenKind> = view.iter().map(|&i| lexed.tokens[i].kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Identifier]
        );
    }
}
