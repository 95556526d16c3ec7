//! Formatter entry point: annotate, partition, align, wrap, render.
//!
//!     The formatter is total. Parse errors still yield a partial tree, so
//!     formatting proceeds on whatever parsed; anything the engine cannot
//!     align or wrap falls back to preserved spacing; disabled byte ranges
//!     are emitted verbatim. All non-whitespace bytes of the input appear
//!     in the output, in order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use svfmt_parser::{NodeKind, RejectedToken, SvAnalyzer, Syntax, TextStructure, TokenKind};

use crate::align::{align_partition_group, format_using_original_spacing};
use crate::annotate::annotate_format_tokens;
use crate::builder::build_partitions;
use crate::comment_controls::disable_formatting_ranges;
use crate::format_token::{GroupBalancing, PreFormatToken, SpacingDecision, SpacingOptions};
use crate::partition::{PartitionPolicy, TokenPartitionTree};
use crate::position::ByteOffsetSet;
use crate::scanners::{alignment_handlers, scan_row, SyntaxNodeIndex};
use crate::style::FormatStyle;
use crate::wrap::search_line_wrapping;

/// Caller-facing knobs beyond the style: extra disabled ranges and a
/// cooperative cancellation flag checked at partition boundaries.
#[derive(Default)]
pub struct FormatOptions {
    pub disabled_ranges: ByteOffsetSet,
}

#[derive(Debug)]
pub enum FormatError {
    /// The cancellation signal fired; no output was produced.
    Cancelled,
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::Cancelled => write!(f, "formatting cancelled"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Result of formatting one source unit.
pub struct FormatOutcome {
    pub text: String,
    pub rejects: Vec<RejectedToken>,
}

/// Build the pre-format token array: every non-whitespace token, each
/// carrying the span of original whitespace before it and its group
/// balance classification.
pub fn make_format_tokens(structure: &TextStructure) -> Vec<PreFormatToken> {
    let mut ftokens = Vec::new();
    let mut prev_end = structure.contents_span().start;
    for token in structure.tokens() {
        if token.is_eof() || token.kind == TokenKind::Whitespace {
            continue;
        }
        let mut f = PreFormatToken::new(*token, svfmt_parser::Span::new(prev_end, token.span.start));
        f.balancing = match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => GroupBalancing::Open,
            TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::MacroCallCloseToEndLine => GroupBalancing::Close,
            _ => GroupBalancing::None,
        };
        ftokens.push(f);
        prev_end = token.span.end;
    }
    ftokens
}

/// Format a whole source text with default options.
pub fn format_source(source: &str, style: &FormatStyle) -> FormatOutcome {
    let cancel = AtomicBool::new(false);
    format_source_with(source, style, &FormatOptions::default(), &cancel)
        .expect("uncancelled formatting cannot fail")
}

/// Format with options and a cancellation flag.
pub fn format_source_with(
    source: &str,
    style: &FormatStyle,
    options: &FormatOptions,
    cancel: &AtomicBool,
) -> Result<FormatOutcome, FormatError> {
    let analyzer = SvAnalyzer::analyze(source);
    let structure = analyzer.structure();

    let mut ftokens = make_format_tokens(structure);

    // Syntax context per token, for the annotator.
    let mut contexts: HashMap<usize, Vec<NodeKind>> = HashMap::new();
    if let Some(tree) = structure.syntax_tree() {
        tree.walk_leaves_with_context(&mut |token, ctx| {
            contexts.insert(token.span.start, ctx.to_vec());
        });
    }
    annotate_format_tokens(&mut ftokens, source, style, |offset| {
        contexts.get(&offset).map(|v| v.as_slice()).unwrap_or(&[])
    });

    let mut partitions = build_partitions(structure, &ftokens, source, style);

    let mut disabled = disable_formatting_ranges(source, structure.tokens());
    disabled.union(&options.disabled_ranges);

    // Alignment pass over the whole partition tree.
    let empty_tree = Syntax::node(NodeKind::Root);
    let syntax_root = structure.syntax_tree().unwrap_or(&empty_tree);
    let node_index = SyntaxNodeIndex::build(syntax_root);
    align_pass(
        &mut partitions,
        &mut ftokens,
        source,
        style,
        &node_index,
        &disabled,
        cancel,
    )?;

    let mut renderer = Renderer {
        ftokens: &ftokens,
        source,
        style,
        disabled: &disabled,
        cancel,
        out: String::new(),
    };
    renderer.render_partition(&partitions)?;
    let mut text = renderer.out;
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(FormatOutcome { text, rejects: analyzer.rejects().to_vec() })
}

/// Number of newlines in the original whitespace before a partition.
fn original_newlines_before(
    partition: &TokenPartitionTree,
    ftokens: &[PreFormatToken],
    source: &str,
) -> usize {
    ftokens
        .get(partition.value.tokens.start)
        .map(|f| f.original_leading_spaces(source).matches('\n').count())
        .unwrap_or(0)
}

/// Recursively align groups of structurally similar sibling rows.
fn align_pass(
    partition: &mut TokenPartitionTree,
    ftokens: &mut Vec<PreFormatToken>,
    source: &str,
    style: &FormatStyle,
    node_index: &SyntaxNodeIndex<'_>,
    disabled: &ByteOffsetSet,
    cancel: &AtomicBool,
) -> Result<(), FormatError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(FormatError::Cancelled);
    }
    for child in &mut partition.children {
        align_pass(child, ftokens, source, style, node_index, disabled, cancel)?;
    }

    // Token start offsets, so row scanners need no live borrow of the
    // format tokens being mutated.
    let token_offsets: Vec<usize> = ftokens.iter().map(|f| f.token.span.start).collect();

    let handlers = alignment_handlers(style);
    let alignable = |origin: Option<NodeKind>| {
        origin.and_then(|o| handlers.iter().find(|h| h.origin == o).map(|h| h.policy))
    };

    // Identify groups among the children: consecutive rows of the same
    // alignable origin, separated by blank lines or unrelated partitions;
    // ignored rows (comment lines) do not break groups.
    let ignore_row: &crate::align::IgnoreRowPredicate =
        &|row: &TokenPartitionTree| row.value.origin == Some(NodeKind::CommentGroup);
    let mut groups: Vec<(NodeKind, Vec<usize>)> = Vec::new();
    let mut current: Option<(NodeKind, Vec<usize>)> = None;
    for (i, child) in partition.children.iter().enumerate() {
        let origin = child.value.origin;
        let blank_separated = original_newlines_before(child, ftokens, source) >= 2;
        if blank_separated {
            if let Some(group) = current.take() {
                groups.push(group);
            }
        }
        if ignore_row(child) {
            continue;
        }
        match (alignable(origin), &mut current) {
            (Some(_), Some((kind, indices))) if origin == Some(*kind) => {
                indices.push(i);
            }
            (Some(_), _) => {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
                current = Some((origin.expect("alignable implies origin"), vec![i]));
            }
            (None, _) => {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
            }
        }
    }
    if let Some(group) = current.take() {
        groups.push(group);
    }

    for (origin, indices) in groups {
        if indices.len() < 2 {
            continue;
        }
        if cancel.load(Ordering::Relaxed) {
            return Err(FormatError::Cancelled);
        }
        // A group partially covered by a disabled range keeps its original
        // spacing instead of being re-aligned.
        let overlaps_disabled = indices.iter().any(|&i| {
            let range = &partition.children[i].value.tokens;
            let span = byte_span(ftokens, range);
            disabled.intersects(span.0, span.1)
        });
        if overlaps_disabled {
            format_using_original_spacing(partition, &indices, ftokens, source);
            continue;
        }
        let policy = alignable(Some(origin)).expect("group built from handler");
        let scanner = |line: &crate::partition::UnwrappedLine| {
            let offset = token_offsets[line.tokens.start];
            scan_row(line, offset, node_index)
        };
        align_partition_group(
            partition,
            &indices,
            &scanner,
            policy,
            style,
            ftokens,
            source,
        );
    }
    Ok(())
}

fn byte_span(ftokens: &[PreFormatToken], range: &std::ops::Range<usize>) -> (usize, usize) {
    let start = ftokens
        .get(range.start)
        .map(|f| f.token.span.start)
        .unwrap_or(0);
    let end = range
        .end
        .checked_sub(1)
        .and_then(|i| ftokens.get(i))
        .map(|f| f.token.span.end)
        .unwrap_or(start);
    (start, end)
}

struct Renderer<'a> {
    ftokens: &'a [PreFormatToken],
    source: &'a str,
    style: &'a FormatStyle,
    disabled: &'a ByteOffsetSet,
    cancel: &'a AtomicBool,
    out: String,
}

impl<'a> Renderer<'a> {
    fn render_partition(&mut self, partition: &TokenPartitionTree) -> Result<(), FormatError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(FormatError::Cancelled);
        }
        if partition.value.tokens.is_empty() && partition.children.is_empty() {
            return Ok(());
        }

        match partition.value.policy {
            PartitionPolicy::AlreadyFormatted => {
                if self.intersects_disabled(partition) {
                    self.emit_verbatim(&partition.value.tokens);
                    return Ok(());
                }
                self.emit_separator(partition);
                self.emit_already_formatted(partition);
                Ok(())
            }
            PartitionPolicy::AlwaysExpand | PartitionPolicy::AppendFittingSubpartitions
                if !partition.children.is_empty() =>
            {
                for child in &partition.children {
                    self.render_partition(child)?;
                }
                Ok(())
            }
            PartitionPolicy::FitOnLineElseExpand if !partition.children.is_empty() => {
                if self.intersects_disabled(partition) {
                    self.emit_verbatim(&partition.value.tokens);
                    return Ok(());
                }
                if self.fits_on_one_line(partition) {
                    self.emit_separator(partition);
                    self.emit_line(
                        partition.value.indentation,
                        partition.value.tokens.clone(),
                    );
                    Ok(())
                } else {
                    for child in &partition.children {
                        self.render_partition(child)?;
                    }
                    Ok(())
                }
            }
            _ => {
                // A line overlapping a disabled region is emitted verbatim,
                // original whitespace included.
                if self.intersects_disabled(partition) {
                    self.emit_verbatim(&partition.value.tokens);
                    return Ok(());
                }
                self.emit_separator(partition);
                self.emit_line(partition.value.indentation, partition.value.tokens.clone());
                Ok(())
            }
        }
    }

    fn intersects_disabled(&self, partition: &TokenPartitionTree) -> bool {
        let (start, end) = byte_span(self.ftokens, &partition.value.tokens);
        self.disabled.intersects(start, end)
    }

    /// Newlines separating this line from the previous output; a single
    /// original blank line is preserved.
    fn emit_separator(&mut self, partition: &TokenPartitionTree) {
        if self.out.is_empty() {
            return;
        }
        let newlines = original_newlines_before(partition, self.ftokens, self.source);
        let count = newlines.clamp(1, 2);
        for _ in 0..count {
            self.out.push('\n');
        }
    }

    fn emit_verbatim(&mut self, range: &std::ops::Range<usize>) {
        for index in range.clone() {
            let ftoken = &self.ftokens[index];
            self.out.push_str(ftoken.original_leading_spaces(self.source));
            self.out.push_str(ftoken.text(self.source));
        }
    }

    fn emit_already_formatted(&mut self, partition: &TokenPartitionTree) {
        self.push_spaces(partition.value.indentation);
        if partition.children.is_empty() {
            self.emit_tokens_flush(partition.value.tokens.clone());
            return;
        }
        for cell in &partition.children {
            self.push_spaces(cell.value.indentation);
            let mut first = true;
            for index in cell.value.tokens.clone() {
                if !first {
                    self.push_spaces(self.ftokens[index].leading_spaces_length(self.source));
                }
                self.out.push_str(self.ftokens[index].text(self.source));
                first = false;
            }
        }
    }

    fn push_spaces(&mut self, count: usize) {
        for _ in 0..count {
            self.out.push(' ');
        }
    }

    fn emit_tokens_flush(&mut self, range: std::ops::Range<usize>) {
        let mut first = true;
        for index in range {
            if !first {
                self.push_spaces(self.ftokens[index].leading_spaces_length(self.source));
            }
            self.out.push_str(self.ftokens[index].text(self.source));
            first = false;
        }
    }

    /// Width of a line rendered without any wrapping; `None` when a
    /// mandatory break makes single-line rendering impossible.
    fn unwrapped_width(&self, indent: usize, range: &std::ops::Range<usize>) -> Option<usize> {
        let mut width = indent;
        for (i, index) in range.clone().enumerate() {
            let ftoken = &self.ftokens[index];
            if i > 0 {
                if ftoken.before.break_decision == SpacingOptions::MustWrap {
                    return None;
                }
                width += ftoken.leading_spaces_length(self.source);
            }
            width += ftoken.length();
        }
        Some(width)
    }

    fn fits_on_one_line(&self, partition: &TokenPartitionTree) -> bool {
        // Only collapse groups the author kept on one line.
        let multiline = self.ftokens[partition.value.tokens.clone()]
            .iter()
            .skip(1)
            .any(|f| f.original_leading_spaces(self.source).contains('\n'));
        if multiline {
            return false;
        }
        match self.unwrapped_width(partition.value.indentation, &partition.value.tokens) {
            Some(width) => width <= self.style.column_limit,
            None => false,
        }
    }

    /// Render one unwrapped line, breaking at mandatory wraps and, when
    /// enabled and needed, at search-chosen points.
    fn emit_line(&mut self, indent: usize, range: std::ops::Range<usize>) {
        if range.is_empty() {
            return;
        }
        let tokens = &self.ftokens[range.clone()];
        let needs_wrapping = self.unwrapped_width(indent, &range).is_none()
            || self.unwrapped_width(indent, &range).unwrap_or(0) > self.style.column_limit;

        let decisions: Option<Vec<SpacingDecision>> = if needs_wrapping
            && (self.style.try_wrap_long_lines
                || tokens
                    .iter()
                    .skip(1)
                    .any(|f| f.before.break_decision == SpacingOptions::MustWrap))
        {
            search_line_wrapping(tokens, self.source, indent, self.style)
        } else {
            None
        };

        self.push_spaces(indent);
        // Re-simulate the wrap-column stack while emitting.
        let mut wrap_columns: Vec<usize> = vec![indent + self.style.wrap_spaces];
        let mut column = indent;
        for (i, index) in range.clone().enumerate() {
            let ftoken = &self.ftokens[index];
            if i > 0 {
                let decision = decisions
                    .as_ref()
                    .map(|d| d[i])
                    .unwrap_or(match ftoken.before.break_decision {
                        SpacingOptions::MustWrap => SpacingDecision::Wrap,
                        SpacingOptions::Preserve => SpacingDecision::Preserve,
                        _ => SpacingDecision::Append,
                    });
                match decision {
                    SpacingDecision::Append => {
                        let spaces = ftoken.leading_spaces_length(self.source);
                        self.push_spaces(spaces);
                        column += spaces;
                    }
                    SpacingDecision::Preserve => {
                        let spaces = ftoken.leading_spaces_length(self.source);
                        self.push_spaces(spaces);
                        column += spaces;
                    }
                    SpacingDecision::Wrap => {
                        self.out.push('\n');
                        let wrap_to = *wrap_columns.last().expect("non-empty stack");
                        self.push_spaces(wrap_to);
                        column = wrap_to;
                    }
                }
            }
            self.out.push_str(ftoken.text(self.source));
            column += ftoken.length();
            match ftoken.balancing {
                GroupBalancing::Open => wrap_columns.push(column),
                GroupBalancing::Close => {
                    if wrap_columns.len() > 1 {
                        wrap_columns.pop();
                    }
                }
                GroupBalancing::None => {}
            }
        }
    }
}
