//! Text structure: one buffer and every analysis derived from it.
//!
//!     The structure owns the source text (an `Arc<str>` allocation plus a
//!     window into it) and keeps the token sequence, the filtered token
//!     view, the lazily built line index, the per-line token index, and the
//!     syntax tree consistent across the three mutations that reshape them:
//!     `filter` (drop tokens from the view), `focus` (narrow to a
//!     sub-range), and `expand` (splice child analyses into leaf positions).
//!
//!     All spans are absolute offsets into the owning allocation; the
//!     contents window moves, the offsets do not. Public line/column
//!     queries, `focus`, and `expand` take offsets relative to the current
//!     contents window, matching what callers see through `contents()`.
//!
//!     Consistency violations are programmer errors: every externally
//!     visible mutation re-checks the invariants and panics on failure.
//!     Malformed *input* can never trip these checks.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::line_column::{LineColumn, LineColumnMap, LineColumnRange};
use crate::token::{Span, Token, TokenKind};
use crate::tree::{NodeKind, Syntax};
use crate::view::{init_view, TokenStreamView};

pub struct TextStructure {
    /// The owning allocation. Shared with child analyses during `expand`.
    buffer: Arc<str>,
    /// Window of `buffer` this structure describes.
    contents: Span,
    /// Contiguous within the window, EOF-terminated.
    tokens: Vec<Token>,
    /// Filtered view: increasing indices into `tokens`, EOF excluded.
    view: TokenStreamView,
    /// Tree over the view's tokens; absent before parsing.
    syntax_tree: Option<Syntax>,
    /// Lazily built from the window text.
    line_map: OnceCell<LineColumnMap>,
    /// Lazily built: first token index at/after each line start, then a
    /// terminating `tokens.len()`.
    line_token_map: OnceCell<Vec<usize>>,
}

impl TextStructure {
    /// An empty structure over `source`: just the EOF sentinel, no view
    /// entries, no tree.
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        let buffer: Arc<str> = source.into();
        let len = buffer.len();
        let s = TextStructure {
            buffer,
            contents: Span::new(0, len),
            tokens: vec![Token::eof_at(len)],
            view: Vec::new(),
            syntax_tree: None,
            line_map: OnceCell::new(),
            line_token_map: OnceCell::new(),
        };
        s.check_consistency();
        s
    }

    /// Structure from an already-lexed token sequence and view.
    pub fn from_parts(source: impl Into<Arc<str>>, tokens: Vec<Token>, view: TokenStreamView) -> Self {
        let buffer: Arc<str> = source.into();
        let len = buffer.len();
        let s = TextStructure {
            buffer,
            contents: Span::new(0, len),
            tokens,
            view,
            syntax_tree: None,
            line_map: OnceCell::new(),
            line_token_map: OnceCell::new(),
        };
        s.check_consistency();
        s
    }

    /// Structure from a token sequence with the default (full) view.
    pub fn tokenized(source: impl Into<Arc<str>>, tokens: Vec<Token>) -> Self {
        let buffer: Arc<str> = source.into();
        let view = init_view(&tokens);
        Self::from_parts(buffer, tokens, view)
    }

    pub fn contents(&self) -> &str {
        &self.buffer[self.contents.as_range()]
    }

    /// The window's absolute position inside the owning allocation.
    pub fn contents_span(&self) -> Span {
        self.contents
    }

    pub fn buffer(&self) -> &Arc<str> {
        &self.buffer
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn view(&self) -> &TokenStreamView {
        &self.view
    }

    /// Tokens selected by the view, in order.
    pub fn view_tokens(&self) -> impl Iterator<Item = &Token> + '_ {
        self.view.iter().map(move |&i| &self.tokens[i])
    }

    pub fn syntax_tree(&self) -> Option<&Syntax> {
        self.syntax_tree.as_ref()
    }

    pub fn set_syntax_tree(&mut self, tree: Syntax) {
        self.syntax_tree = Some(tree);
        self.check_consistency();
    }

    /// Replace the token sequence wholesale; the view resets to all tokens.
    pub fn set_token_sequence(&mut self, tokens: Vec<Token>) {
        self.view = init_view(&tokens);
        self.tokens = tokens;
        self.invalidate_lazy();
        self.check_consistency();
    }

    /// Mutate tokens in the sequence and the copies at the tree leaves.
    pub fn mutate_tokens<F: FnMut(&mut Token)>(&mut self, mut mutate: F) {
        for token in &mut self.tokens {
            mutate(token);
        }
        if let Some(tree) = &mut self.syntax_tree {
            tree.mutate_leaves(&mut mutate);
        }
        self.check_consistency();
    }

    fn invalidate_lazy(&mut self) {
        self.line_map = OnceCell::new();
        self.line_token_map = OnceCell::new();
    }

    fn line_map(&self) -> &LineColumnMap {
        self.line_map.get_or_init(|| LineColumnMap::new(self.contents()))
    }

    fn line_token_map(&self) -> &[usize] {
        self.line_token_map.get_or_init(|| {
            let mut map = Vec::with_capacity(self.line_map().line_count() + 1);
            let mut token_index = 0usize;
            for &line_offset in self.line_map().beginning_of_line_offsets() {
                let abs = self.contents.start + line_offset;
                while token_index < self.tokens.len()
                    && self.tokens[token_index].span.start < abs
                {
                    token_index += 1;
                }
                map.push(token_index);
            }
            map.push(self.tokens.len());
            map
        })
    }

    /// Number of lines in the window.
    pub fn line_count(&self) -> usize {
        self.line_map().line_count()
    }

    /// Line/column at a window-relative byte offset; O(log lines), column in
    /// characters.
    pub fn line_column(&self, offset: usize) -> LineColumn {
        self.line_map().line_column_at_offset(self.contents(), offset)
    }

    /// Line/column range a token covers. EOF reports the final position for
    /// both endpoints.
    pub fn range_for(&self, token: &Token) -> LineColumnRange {
        if token.is_eof() {
            let end = self.line_column(self.contents.len());
            return LineColumnRange { start: end, end };
        }
        LineColumnRange {
            start: self.line_column(token.span.start - self.contents.start),
            end: self.line_column(token.span.end - self.contents.start),
        }
    }

    /// Indices of tokens whose text begins inside the window-relative range
    /// `[lo, hi)`. Two binary searches.
    pub fn tokens_spanning(&self, lo: usize, hi: usize) -> std::ops::Range<usize> {
        let abs_lo = self.contents.start + lo;
        let abs_hi = self.contents.start + hi;
        let start = self.tokens.partition_point(|t| t.span.start < abs_lo);
        let end = start
            + self.tokens[start..].partition_point(|t| t.span.start < abs_hi);
        start..end
    }

    /// Indices of tokens starting on the 0-based line `lineno`; the last
    /// token in the range is the one that spans the terminating newline.
    pub fn tokens_on_line(&self, lineno: usize) -> std::ops::Range<usize> {
        let map = self.line_token_map();
        if lineno + 1 < map.len() {
            map[lineno]..map[lineno + 1]
        } else {
            self.tokens.len()..self.tokens.len()
        }
    }

    /// The token at a line/column position, or EOF when out of range.
    pub fn find_token_at(&self, pos: LineColumn) -> Token {
        for index in self.tokens_on_line(pos.line) {
            let token = &self.tokens[index];
            if token.is_eof() {
                break;
            }
            if self.range_for(token).contains(pos) {
                return *token;
            }
        }
        self.eof_token()
    }

    /// The EOF sentinel for the current window.
    pub fn eof_token(&self) -> Token {
        Token::eof_at(self.contents.end)
    }

    /// Restrict the view to tokens satisfying `keep`. In place, idempotent,
    /// order-preserving.
    pub fn filter_view<F: Fn(&Token) -> bool>(&mut self, keep: F) {
        let tokens = &self.tokens;
        self.view.retain(|&i| keep(&tokens[i]));
        self.check_consistency();
    }

    /// Update every token and tree leaf to point into `superstring`, where
    /// the current window's text appears starting at `offset`.
    ///
    /// Used to transfer a child analysis into an enclosing buffer before
    /// splicing (`expand`).
    pub fn rebase(&mut self, superstring: Arc<str>, offset: usize) {
        debug_assert_eq!(
            &superstring[offset..offset + self.contents.len()],
            self.contents(),
            "rebase target must contain the current contents at `offset`"
        );
        let old_start = self.contents.start;
        let shift = move |span: Span| {
            Span::new(offset + (span.start - old_start), offset + (span.end - old_start))
        };
        for token in &mut self.tokens {
            token.span = shift(token.span);
        }
        if let Some(tree) = &mut self.syntax_tree {
            tree.mutate_leaves(&mut |t| t.span = shift(t.span));
        }
        let len = self.contents.len();
        self.contents = Span::new(offset, offset + len);
        self.buffer = superstring;
        self.invalidate_lazy();
        self.check_consistency();
    }

    /// Narrow this structure to the window-relative range
    /// `[offset, offset + length)`.
    ///
    /// The syntax tree becomes the largest subtree wholly contained in the
    /// range (an empty node when there is none), the token sequence is
    /// trimmed — a final token straddling the boundary is clipped — and
    /// re-terminated with EOF, the view keeps the surviving entries, the
    /// window shrinks, and the line indexes rebuild.
    pub fn focus(&mut self, offset: usize, length: usize) {
        let abs_lo = self.contents.start + offset;
        let abs_hi = (abs_lo + length).min(self.contents.end);
        let range = Span::new(abs_lo, abs_hi);

        // (a) Trim the tree.
        self.syntax_tree = Some(match &self.syntax_tree {
            Some(tree) => tree
                .largest_subtree_in(range)
                .cloned()
                .unwrap_or_else(|| Syntax::node(NodeKind::Root)),
            None => Syntax::node(NodeKind::Root),
        });

        // (b) Trim the token sequence, clipping a straddling final token.
        let keep = self.tokens_spanning(offset, offset + (abs_hi - abs_lo));
        let mut trimmed: Vec<Token> = self.tokens[keep.clone()]
            .iter()
            .filter(|t| !t.is_eof())
            .copied()
            .collect();
        if let Some(last) = trimmed.last_mut() {
            if last.span.end > abs_hi {
                last.span.end = abs_hi;
            }
        }
        let eof_at = trimmed.last().map(|t| t.span.end).unwrap_or(abs_lo);
        trimmed.push(Token::eof_at(eof_at));

        // (c) Trim the view to the surviving tokens.
        let new_view: TokenStreamView = self
            .view
            .iter()
            .filter(|&&i| keep.contains(&i) && !self.tokens[i].is_eof())
            .map(|&i| i - keep.start)
            .collect();

        // (d) Shrink the window to the requested range; (e) rebuild the
        // line indexes lazily.
        self.tokens = trimmed;
        self.view = new_view;
        self.contents = Span::new(abs_lo, abs_hi);
        self.invalidate_lazy();
        self.check_consistency();
    }

    /// Splice child analyses into this structure.
    ///
    /// Keys are window-relative offsets of expansion points; each child's
    /// contents must be exactly the text at its expansion point. For each
    /// entry, in offset order: parent tokens up to the offset are kept, the
    /// child's tokens (rebased into this buffer, EOF dropped) are spliced
    /// in, the child's tree root replaces the leaf at that offset, and one
    /// parent token — the placeholder — is skipped. The view is rebuilt;
    /// the per-line token index is invalidated.
    pub fn expand(&mut self, expansions: BTreeMap<usize, TextStructure>) {
        let mut combined: Vec<Token> = Vec::with_capacity(self.tokens.len());
        let mut view_indices: Vec<usize> = Vec::new();
        let mut token_cursor = 0usize;
        let mut view_cursor = 0usize;

        for (rel_offset, mut child) in expansions {
            let abs_offset = self.contents.start + rel_offset;

            // Copy parent tokens and view entries up to the expansion point.
            let next_token = token_cursor
                + self.tokens[token_cursor..]
                    .partition_point(|t| t.span.start < abs_offset);
            let next_view = view_cursor
                + self.view[view_cursor..]
                    .partition_point(|&i| self.tokens[i].span.start < abs_offset);
            for &vi in &self.view[view_cursor..next_view] {
                view_indices.push(combined.len() + (vi - token_cursor));
            }
            combined.extend_from_slice(&self.tokens[token_cursor..next_token]);

            // Bring the child into this buffer.
            child.rebase(Arc::clone(&self.buffer), abs_offset);
            let mut child_tokens = std::mem::take(&mut child.tokens);
            if child_tokens.last().is_some_and(|t| t.is_eof()) {
                child_tokens.pop();
            }
            for &vi in &child.view {
                if vi < child_tokens.len() {
                    view_indices.push(combined.len() + vi);
                }
            }
            combined.extend_from_slice(&child_tokens);

            // Transfer the child's tree into the expansion point.
            if let Some(child_tree) = child.syntax_tree.take() {
                if let Some(tree) = &mut self.syntax_tree {
                    tree.replace_leaf_at(abs_offset, child_tree);
                }
            }

            // Skip the placeholder token (and its view entry, if any).
            token_cursor = (next_token + 1).min(self.tokens.len());
            view_cursor = next_view;
            if view_cursor < self.view.len() && self.view[view_cursor] < token_cursor {
                view_cursor += 1;
            }
        }

        // Copy the remainder past the last expansion point.
        for &vi in &self.view[view_cursor..] {
            view_indices.push(combined.len() + (vi - token_cursor));
        }
        combined.extend_from_slice(&self.tokens[token_cursor..]);

        self.tokens = combined;
        self.view = view_indices;
        self.invalidate_lazy();
        self.check_consistency();
    }

    /// Panic when any structural invariant is broken. Programmer error, not input
    /// error.
    pub fn check_consistency(&self) {
        // Token extremities lie inside the window.
        if let Some(first) = self.tokens.iter().find(|t| !t.is_eof()) {
            assert!(
                first.span.start >= self.contents.start,
                "token starts before the contents window"
            );
        }
        if let Some(last) = self.tokens.iter().rev().find(|t| !t.is_eof()) {
            assert!(
                last.span.end <= self.contents.end,
                "token ends past the contents window"
            );
        }
        // The sequence is contiguous and EOF-terminated.
        for pair in self.tokens.windows(2) {
            if !pair[1].is_eof() {
                assert_eq!(
                    pair[0].span.end, pair[1].span.start,
                    "token sequence must be contiguous"
                );
            }
        }
        assert!(
            self.tokens.last().is_some_and(|t| t.is_eof()),
            "token sequence must end with EOF"
        );
        // View entries increase strictly and stay in bounds.
        for pair in self.view.windows(2) {
            assert!(pair[0] < pair[1], "view indices must strictly increase");
        }
        if let Some(&last) = self.view.last() {
            assert!(last < self.tokens.len(), "view index out of bounds");
        }
        // Tree extremities lie inside the window.
        if let Some(tree) = &self.syntax_tree {
            if let Some(span) = tree.span() {
                assert!(
                    span.start >= self.contents.start && span.end <= self.contents.end,
                    "syntax tree leaves must lie inside the contents window"
                );
            }
        }
        // Line index endpoints match the window, if built.
        if let Some(map) = self.line_map.get() {
            let offsets = map.beginning_of_line_offsets();
            assert_eq!(offsets.first(), Some(&0));
            assert!(*offsets.last().unwrap_or(&0) <= self.contents.len());
        }
        if let Some(map) = self.line_token_map.get() {
            assert_eq!(map.first(), Some(&0));
            assert_eq!(map.last(), Some(&self.tokens.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::tree::SyntaxNode;
    use crate::view::filter_for_syntax;

    /// "hello, world" analyzed as three leaf tokens under one node.
    fn hello_world() -> TextStructure {
        let source = "hello, world";
        let tokens = vec![
            Token::new(TokenKind::Identifier, Span::new(0, 5)),
            Token::new(TokenKind::Comma, Span::new(5, 6)),
            Token::new(TokenKind::Whitespace, Span::new(6, 7)),
            Token::new(TokenKind::Identifier, Span::new(7, 12)),
            Token::eof_at(12),
        ];
        let mut s = TextStructure::tokenized(source, tokens);
        s.filter_view(|t| !t.kind.is_trivia());
        let tree = Syntax::Node(SyntaxNode::with_children(
            NodeKind::Root,
            vec![
                Syntax::leaf(Token::new(TokenKind::Identifier, Span::new(0, 5))),
                Syntax::leaf(Token::new(TokenKind::Comma, Span::new(5, 6))),
                Syntax::leaf(Token::new(TokenKind::Identifier, Span::new(7, 12))),
            ],
        ));
        s.set_syntax_tree(tree);
        s
    }

    #[test]
    fn test_focus_narrows_to_leaf() {
        let mut s = hello_world();
        s.focus(0, 5);
        assert_eq!(s.contents(), "hello");
        // The leaf plus an EOF pointing at offset 5.
        assert_eq!(s.tokens().len(), 2);
        assert_eq!(s.tokens()[0].span, Span::new(0, 5));
        assert_eq!(s.tokens()[1], Token::eof_at(5));
        let tree = s.syntax_tree().unwrap();
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.span(), Some(Span::new(0, 5)));
    }

    #[test]
    fn test_focus_with_no_containing_subtree() {
        let mut s = hello_world();
        // Range splits the first identifier; no subtree fits.
        s.focus(1, 3);
        let tree = s.syntax_tree().unwrap();
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(s.contents(), "ell");
    }

    #[test]
    fn test_focus_clips_straddling_token() {
        let source = "abcdef";
        let tokens = vec![
            Token::new(TokenKind::Identifier, Span::new(0, 6)),
            Token::eof_at(6),
        ];
        let mut s = TextStructure::tokenized(source, tokens);
        s.focus(0, 4);
        assert_eq!(s.tokens()[0].span, Span::new(0, 4));
        assert_eq!(s.tokens()[1], Token::eof_at(4));
        assert_eq!(s.contents(), "abcd");
    }

    #[test]
    fn test_line_column_queries() {
        let source = "wire w;\nreg \u{e9}r;\n";
        let lexed = tokenize(source);
        let s = TextStructure::tokenized(source, lexed.tokens);
        assert_eq!(s.line_column(0), LineColumn { line: 0, column: 0 });
        assert_eq!(s.line_column(8), LineColumn { line: 1, column: 0 });
        // Past the two-byte character: byte 14 is column 6... count chars.
        let pos = s.line_column(14);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 5);
    }

    #[test]
    fn test_tokens_on_line_and_find_token_at() {
        let source = "wire w;\nreg r;\n";
        let lexed = tokenize(source);
        let s = TextStructure::tokenized(source, lexed.tokens);
        let line1 = s.tokens_on_line(1);
        let kinds: Vec<TokenKind> = s.tokens()[line1].iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Reg,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Whitespace,
            ]
        );
        let token = s.find_token_at(LineColumn { line: 1, column: 4 });
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.text(s.contents()), "r");
        // Out of range lands on EOF.
        let miss = s.find_token_at(LineColumn { line: 9, column: 0 });
        assert!(miss.is_eof());
    }

    #[test]
    fn test_tokens_spanning_binary_search() {
        let source = "a bb ccc";
        let lexed = tokenize(source);
        let s = TextStructure::tokenized(source, lexed.tokens);
        // Range [2, 4) covers "bb" only.
        let range = s.tokens_spanning(2, 4);
        let kinds: Vec<&str> = s.tokens()[range]
            .iter()
            .map(|t| t.text(s.contents()))
            .collect();
        assert_eq!(kinds, vec!["bb"]);
    }

    #[test]
    fn test_range_for_eof() {
        let source = "x\n";
        let lexed = tokenize(source);
        let s = TextStructure::tokenized(source, lexed.tokens);
        let eof = s.eof_token();
        let range = s.range_for(&eof);
        assert_eq!(range.start, range.end);
        assert_eq!(range.start, LineColumn { line: 1, column: 0 });
    }

    #[test]
    fn test_rebase_into_superstring() {
        let child_text = "world";
        let tokens = vec![
            Token::new(TokenKind::Identifier, Span::new(0, 5)),
            Token::eof_at(5),
        ];
        let mut child = TextStructure::tokenized(child_text, tokens);
        child.set_syntax_tree(Syntax::leaf(Token::new(
            TokenKind::Identifier,
            Span::new(0, 5),
        )));

        let superstring: Arc<str> = Arc::from("hello, world");
        child.rebase(Arc::clone(&superstring), 7);
        assert_eq!(child.contents(), "world");
        assert_eq!(child.tokens()[0].span, Span::new(7, 12));
        assert_eq!(child.syntax_tree().unwrap().span(), Some(Span::new(7, 12)));
    }

    #[test]
    fn test_expand_splices_child_analysis() {
        // Parent: "x `M y" with `M as a placeholder leaf.
        let source = "x `M y";
        let tokens = vec![
            Token::new(TokenKind::Identifier, Span::new(0, 1)),
            Token::new(TokenKind::Whitespace, Span::new(1, 2)),
            Token::new(TokenKind::MacroIdentifier, Span::new(2, 4)),
            Token::new(TokenKind::Whitespace, Span::new(4, 5)),
            Token::new(TokenKind::Identifier, Span::new(5, 6)),
            Token::eof_at(6),
        ];
        let mut parent = TextStructure::tokenized(source, tokens);
        parent.filter_view(|t| !t.kind.is_trivia());
        parent.set_syntax_tree(Syntax::Node(SyntaxNode::with_children(
            NodeKind::Root,
            vec![
                Syntax::leaf(Token::new(TokenKind::Identifier, Span::new(0, 1))),
                Syntax::leaf(Token::new(TokenKind::MacroIdentifier, Span::new(2, 4))),
                Syntax::leaf(Token::new(TokenKind::Identifier, Span::new(5, 6))),
            ],
        )));

        // Child: analysis of the substring "`M" as two tokens.
        let child_tokens = vec![
            Token::new(TokenKind::Identifier, Span::new(0, 1)),
            Token::new(TokenKind::Identifier, Span::new(1, 2)),
            Token::eof_at(2),
        ];
        let mut child = TextStructure::tokenized("`M", child_tokens);
        child.set_syntax_tree(Syntax::Node(SyntaxNode::with_children(
            NodeKind::Statement,
            vec![
                Syntax::leaf(Token::new(TokenKind::Identifier, Span::new(0, 1))),
                Syntax::leaf(Token::new(TokenKind::Identifier, Span::new(1, 2))),
            ],
        )));

        let mut expansions = BTreeMap::new();
        expansions.insert(2usize, child);
        parent.expand(expansions);

        // Placeholder replaced by the child's two tokens.
        let texts: Vec<&str> = parent
            .tokens()
            .iter()
            .filter(|t| !t.is_eof())
            .map(|t| t.text(parent.buffer()))
            .collect();
        assert_eq!(texts, vec!["x", " ", "`", "M", " ", "y"]);
        // Tree now holds the child node where the placeholder leaf was.
        let tree = parent.syntax_tree().unwrap();
        assert_eq!(tree.leaf_count(), 4);
        // View stays strictly increasing and trivia-free.
        parent.check_consistency();
        let view_kinds: Vec<TokenKind> =
            parent.view_tokens().map(|t| t.kind).collect();
        assert!(view_kinds.iter().all(|k| !k.is_trivia()));
    }

    #[test]
    fn test_filter_view_is_idempotent() {
        let source = "a // c\nb";
        let lexed = tokenize(source);
        let mut s = TextStructure::tokenized(source, lexed.tokens);
        let mut view = s.view().clone();
        filter_for_syntax(s.tokens(), &mut view);
        s.filter_view(|t| !t.kind.is_trivia());
        assert_eq!(s.view(), &view);
        s.filter_view(|t| !t.kind.is_trivia());
        assert_eq!(s.view(), &view);
    }

    #[test]
    #[should_panic(expected = "contiguous")]
    fn test_consistency_rejects_gap() {
        let tokens = vec![
            Token::new(TokenKind::Identifier, Span::new(0, 1)),
            Token::new(TokenKind::Identifier, Span::new(2, 3)),
            Token::eof_at(3),
        ];
        TextStructure::tokenized("abc", tokens);
    }
}
