//! Tabular alignment of token partitions.
//!
//!     Groups of structurally similar rows (port declarations, named port
//!     connections, case items, assignments, enum entries) are rendered
//!     into columns whose widths are the maximum cell width across the
//!     group, subject to the column limit.
//!
//!     Columns are identified by syntax-tree paths, not by position, so a
//!     row missing an optional construct simply contributes no cell to
//!     that column; aggregation across rows collates columns by the total
//!     lexicographic order on paths.
//!
//!     When the aligned layout would overflow the column limit the engine
//!     abandons alignment; the infer-user-intent policy additionally
//!     decides between aligning, flushing left, and preserving based on
//!     how far the original spacing sits from each candidate.

use std::collections::BTreeMap;
use std::ops::Range;

use svfmt_parser::SyntaxTreePath;

use crate::format_token::{
    effective_cell_width, effective_left_border_width, PreFormatToken, SpacingOptions,
};
use crate::partition::{PartitionPolicy, TokenPartitionTree, UnwrappedLine};
use crate::style::{AlignmentPolicy, FormatStyle};
use crate::vtree::VTree;

/// Column behavior requested by a cell scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentColumnProperties {
    /// Pack cell contents against the left border (else the right).
    pub flush_left: bool,
    /// Delimiter columns (like the `:` of case items) collapse when the
    /// widest preceding cell sits in the last row.
    pub contains_delimiter: bool,
    /// Minimum left border width, max-propagated to the leftmost subcolumn.
    pub left_border_override: usize,
}

impl Default for AlignmentColumnProperties {
    fn default() -> Self {
        AlignmentColumnProperties {
            flush_left: true,
            contains_delimiter: false,
            left_border_override: 0,
        }
    }
}

impl AlignmentColumnProperties {
    pub fn flush_right(mut self) -> Self {
        self.flush_left = false;
        self
    }

    pub fn delimiter(mut self) -> Self {
        self.contains_delimiter = true;
        self
    }

    pub fn border(mut self, width: usize) -> Self {
        self.left_border_override = width;
        self
    }
}

/// One column position reserved by a scanner for one row.
#[derive(Debug, Clone)]
pub struct ColumnPositionEntry {
    /// Total order among alignment points across rows.
    pub path: SyntaxTreePath,
    /// Byte offset of the token starting this cell in this row.
    pub starting_offset: usize,
    pub properties: AlignmentColumnProperties,
}

/// Sparse per-row column tree produced by a scanner. The root entry is a
/// placeholder; its children are the columns.
pub type ColumnPositionTree = VTree<ColumnPositionEntry>;

/// An empty root for scanners to hang columns from.
pub fn column_tree_root() -> ColumnPositionTree {
    VTree::new(ColumnPositionEntry {
        path: SyntaxTreePath::new(),
        starting_offset: 0,
        properties: AlignmentColumnProperties::default(),
    })
}

/// Scanner: one row's unwrapped line to its sparse column-position tree.
pub type AlignmentCellScanner<'a> = dyn Fn(&UnwrappedLine) -> ColumnPositionTree + 'a;

/// Row filter: rows matching this are dropped from the alignment group
/// (typically comment-only lines).
pub type IgnoreRowPredicate<'a> = dyn Fn(&TokenPartitionTree) -> bool + 'a;

#[derive(Debug, Clone, Default)]
struct AggregateColumnData {
    path: SyntaxTreePath,
    properties: AlignmentColumnProperties,
}

impl Default for AlignmentCell {
    fn default() -> Self {
        AlignmentCell { tokens: 0..0, compact_width: 0, left_border_width: 0 }
    }
}

/// One cell of the alignment matrix: a token sub-range plus its computed
/// widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentCell {
    pub tokens: Range<usize>,
    pub compact_width: usize,
    pub left_border_width: usize,
}

impl AlignmentCell {
    fn is_unused(&self) -> bool {
        self.tokens.is_empty() && self.compact_width == 0
    }

    fn is_composite(&self) -> bool {
        self.tokens.is_empty() && self.compact_width > 0
    }

    fn total_width(&self) -> usize {
        self.left_border_width + self.compact_width
    }

    fn update_widths(&mut self, ftokens: &[PreFormatToken], source: &str) {
        self.compact_width = effective_cell_width(&ftokens[self.tokens.clone()], source);
        self.left_border_width = effective_left_border_width(&ftokens[self.tokens.clone()]);
    }
}

type AlignmentRow = VTree<AlignmentCell>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct AlignedColumnConfiguration {
    width: usize,
    left_border: usize,
}

impl AlignedColumnConfiguration {
    fn total_width(&self) -> usize {
        self.left_border + self.width
    }

    fn update_from_cell(&mut self, cell: &AlignmentCell) {
        self.width = self.width.max(cell.compact_width);
        self.left_border = self.left_border.max(cell.left_border_width);
    }
}

/// Collects the union of all rows' columns, keyed by syntax-tree path.
#[derive(Default)]
struct ColumnSchemaAggregator {
    columns: Option<VTree<AggregateColumnData>>,
    /// Path of each column in the aggregate tree, keyed by syntax path.
    index: BTreeMap<SyntaxTreePath, Vec<usize>>,
}

impl ColumnSchemaAggregator {
    fn collect(&mut self, sparse: &ColumnPositionTree) {
        if self.columns.is_none() {
            self.columns = Some(VTree::new(AggregateColumnData::default()));
        }
        let root = self.columns.as_mut().expect("just initialized");
        Self::collect_into(sparse, root);
    }

    fn collect_into(sparse: &ColumnPositionTree, aggregate: &mut VTree<AggregateColumnData>) {
        for subcolumn in &sparse.children {
            let pos = aggregate
                .children
                .iter()
                .position(|c| c.value.path == subcolumn.value.path);
            let slot = match pos {
                Some(i) => &mut aggregate.children[i],
                None => {
                    aggregate.children.push(VTree::new(AggregateColumnData {
                        path: subcolumn.value.path.clone(),
                        properties: subcolumn.value.properties,
                    }));
                    aggregate.children.last_mut().expect("just pushed")
                }
            };
            Self::collect_into(subcolumn, slot);
        }
    }

    /// Sort columns by path and build the path index. Propagates any left
    /// border override down to each node's leftmost subcolumn.
    fn finalize(&mut self) {
        let Some(root) = self.columns.as_mut() else { return };
        fn sort_and_propagate(node: &mut VTree<AggregateColumnData>) {
            node.children.sort_by(|a, b| a.value.path.cmp(&b.value.path));
            if let Some(first) = node.children.first_mut() {
                first.value.properties.left_border_override = first
                    .value
                    .properties
                    .left_border_override
                    .max(node.value.properties.left_border_override);
            }
            for child in &mut node.children {
                sort_and_propagate(child);
            }
        }
        sort_and_propagate(root);

        self.index.clear();
        fn index_columns(
            node: &VTree<AggregateColumnData>,
            path: &mut Vec<usize>,
            index: &mut BTreeMap<SyntaxTreePath, Vec<usize>>,
        ) {
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                index.insert(child.value.path.clone(), path.clone());
                index_columns(child, path, index);
                path.pop();
            }
        }
        index_columns(root, &mut Vec::new(), &mut self.index);
    }

    fn column_properties(&self) -> VTree<AlignmentColumnProperties> {
        self.columns
            .as_ref()
            .map(|c| c.map(|d| d.properties))
            .unwrap_or_else(|| VTree::new(AlignmentColumnProperties::default()))
    }
}

/// Bind the sparse columns of one row to a dense cell tree.
fn fill_alignment_row(
    sparse: &ColumnPositionTree,
    row_range: Range<usize>,
    index: &BTreeMap<SyntaxTreePath, Vec<usize>>,
    row: &mut AlignmentRow,
    ftokens: &[PreFormatToken],
) {
    if sparse.is_leaf() {
        return;
    }
    let mut remaining = row_range.clone();
    let mut prev_cell_path: Option<Vec<usize>> = None;
    for leaf in sparse.leaves() {
        let Some(tree_path) = index.get(&leaf.value.path) else { continue };
        let Some(found) = ftokens[remaining.clone()]
            .iter()
            .position(|f| f.token.span.start == leaf.value.starting_offset)
        else {
            continue;
        };
        let cell_start = remaining.start + found;
        remaining.start = cell_start;
        if let Some(prev) = prev_cell_path.take() {
            if let Some(prev_cell) = row.descend_mut(&prev) {
                prev_cell.value.tokens.end = cell_start;
            }
        }
        if let Some(cell) = row.descend_mut(tree_path) {
            cell.value.tokens = cell_start..row_range.end;
            prev_cell_path = Some(tree_path.clone());
        }
    }
}

/// Bottom-up width computation; composite cells span their children.
fn update_and_propagate_row_cell_widths(
    node: &mut AlignmentRow,
    ftokens: &[PreFormatToken],
    source: &str,
) {
    node.value.update_widths(ftokens, source);
    if node.is_leaf() {
        return;
    }
    let mut total = 0;
    for child in &mut node.children {
        update_and_propagate_row_cell_widths(child, ftokens, source);
        total += child.value.total_width();
    }
    if node.value.tokens.is_empty() {
        node.value.left_border_width = node.children[0].value.left_border_width;
        node.value.compact_width = total - node.value.left_border_width;
    }
}

fn compute_row_cell_widths(row: &mut AlignmentRow, ftokens: &[PreFormatToken], source: &str) {
    update_and_propagate_row_cell_widths(row, ftokens, source);
    // The leftmost border belongs to indentation, not to the table.
    let mut front = row;
    loop {
        front.value.left_border_width = 0;
        if front.is_leaf() {
            break;
        }
        front = &mut front.children[0];
    }
}

/// Max cell widths per column, with the delimiter-column last-row rule and
/// per-column border overrides applied.
fn compute_column_widths(
    matrix: &[AlignmentRow],
    properties: &VTree<AlignmentColumnProperties>,
) -> VTree<AlignedColumnConfiguration> {
    let mut configs = properties.map(|_| AlignedColumnConfiguration::default());

    // Delimiter handling: find the longest cell directly before a
    // delimiter column; when it lives in the last row, the delimiter
    // column collapses to zero so labels align to the last entry.
    let prop_order = properties.preorder();
    let mut longest_before_delimiter = 0;
    let mut align_to_last_row = false;
    for (row_index, row) in matrix.iter().enumerate() {
        let row_order = row.preorder();
        for (i, node) in row_order.iter().enumerate() {
            if let Some(next_prop) = prop_order.get(i + 1) {
                if next_prop.value.contains_delimiter {
                    if longest_before_delimiter < node.value.total_width() {
                        longest_before_delimiter = node.value.total_width();
                        align_to_last_row = row_index + 1 == matrix.len();
                    }
                    break;
                }
            }
        }
    }

    for row in matrix {
        fn zip_update(
            config: &mut VTree<AlignedColumnConfiguration>,
            props: &VTree<AlignmentColumnProperties>,
            cell: &AlignmentRow,
            align_to_last_row: bool,
        ) {
            if props.value.contains_delimiter && align_to_last_row {
                config.value.width = 0;
                config.value.left_border = 0;
            } else {
                config.value.update_from_cell(&cell.value);
                if props.value.left_border_override > 0 {
                    config.value.left_border = props.value.left_border_override;
                }
            }
            for ((c, p), r) in config
                .children
                .iter_mut()
                .zip(props.children.iter())
                .zip(cell.children.iter())
            {
                zip_update(c, p, r, align_to_last_row);
            }
        }
        zip_update(&mut configs, properties, row, align_to_last_row);
    }

    // Widen parents to fit their subcolumns.
    configs.for_each_postorder_mut(&mut |node| {
        if !node.is_leaf() {
            let children_width: usize =
                node.children.iter().map(|c| c.value.total_width()).sum();
            node.value.left_border = node
                .value
                .left_border
                .max(node.children[0].value.left_border);
            node.value.width = node
                .value
                .width
                .max(children_width.saturating_sub(node.value.left_border));
        }
    });
    configs
}

/// A saved spacing mutation for one cell-leading token.
#[derive(Debug, Clone, Copy)]
struct DeferredTokenAlignment {
    ftoken: usize,
    new_before_spacing: usize,
}

impl DeferredTokenAlignment {
    /// Edit distance between aligned and flush-left formatting.
    fn align_vs_flush_left_difference(&self, ftokens: &[PreFormatToken]) -> i64 {
        self.new_before_spacing as i64 - ftokens[self.ftoken].before.spaces_required as i64
    }
}

fn compute_aligned_row_cell_spacings(
    configs: &VTree<AlignedColumnConfiguration>,
    properties: &VTree<AlignmentColumnProperties>,
    row: &AlignmentRow,
    actions: &mut Vec<DeferredTokenAlignment>,
    accrued_spaces: &mut usize,
) {
    for ((config, props), cell) in configs
        .children
        .iter()
        .zip(properties.children.iter())
        .zip(row.children.iter())
    {
        if cell.value.is_unused() {
            *accrued_spaces += config.value.total_width();
        } else if cell.value.is_composite() {
            let subcolumns_width: usize = config
                .children
                .iter()
                .map(|c| c.value.total_width())
                .sum();
            let padding = config.value.total_width().saturating_sub(subcolumns_width);
            if !props.value.flush_left {
                *accrued_spaces += padding;
            }
            compute_aligned_row_cell_spacings(config, props, cell, actions, accrued_spaces);
            if props.value.flush_left {
                *accrued_spaces += padding;
            }
        } else {
            *accrued_spaces += config.value.left_border;
            let padding = config.value.width.saturating_sub(cell.value.compact_width);
            let ftoken = cell.value.tokens.start;
            let left_spacing;
            if props.value.flush_left {
                if props.value.contains_delimiter {
                    left_spacing = 0;
                    *accrued_spaces += padding;
                } else {
                    left_spacing = *accrued_spaces;
                    *accrued_spaces = padding;
                }
            } else {
                left_spacing = *accrued_spaces + padding;
                *accrued_spaces = 0;
            }
            actions.push(DeferredTokenAlignment { ftoken, new_before_spacing: left_spacing });
        }
    }
}

/// Alignment calculations for one alignable group.
#[derive(Default)]
struct GroupAlignmentData {
    matrix: Vec<AlignmentRow>,
    /// Empty means: do not align.
    align_actions_2d: Vec<Vec<DeferredTokenAlignment>>,
}

impl GroupAlignmentData {
    fn max_absolute_align_vs_flush_left_difference(
        &self,
        ftokens: &[PreFormatToken],
    ) -> i64 {
        self.align_actions_2d
            .iter()
            .flatten()
            .map(|a| a.align_vs_flush_left_difference(ftokens).abs())
            .max()
            .unwrap_or(0)
    }
}

/// One row of an alignable group: the child index in the parent partition.
struct RowInfo {
    child: usize,
    range: Range<usize>,
    indentation: usize,
}

fn calculate_alignment_spacings(
    rows: &[RowInfo],
    lines: &[UnwrappedLine],
    scanner: &AlignmentCellScanner,
    column_limit: usize,
    ftokens: &[PreFormatToken],
    source: &str,
) -> GroupAlignmentData {
    let mut result = GroupAlignmentData::default();
    if rows.len() <= 1 {
        return result;
    }

    // Walk each row's syntax, collecting sparse columns and the aggregate
    // schema (union across rows, keyed by path).
    let mut aggregator = ColumnSchemaAggregator::default();
    let mut sparse_rows = Vec::with_capacity(rows.len());
    for line in lines {
        let mut sparse = scanner(line);
        sparse
            .children
            .sort_by(|a, b| a.value.path.cmp(&b.value.path));
        aggregator.collect(&sparse);
        sparse_rows.push(sparse);
    }
    aggregator.finalize();
    let Some(aggregate) = aggregator.columns.as_ref() else {
        return result;
    };
    let column_properties = aggregator.column_properties();

    // Dense matrix: one same-shaped cell tree per row; unbound cells are
    // empty (width 0).
    for (row, sparse) in rows.iter().zip(sparse_rows.iter()) {
        let mut dense = aggregate.map(|_| AlignmentCell::default());
        fill_alignment_row(sparse, row.range.clone(), &aggregator.index, &mut dense, ftokens);
        compute_row_cell_widths(&mut dense, ftokens, source);
        result.matrix.push(dense);
    }

    let column_configs = compute_column_widths(&result.matrix, &column_properties);

    // Fit check, including each row's epilog past its last aligned cell.
    let indentation = rows.first().map(|r| r.indentation).unwrap_or(0);
    let total_column_width = indentation + column_configs.value.total_width();
    if total_column_width > column_limit {
        return result;
    }
    for (row, dense) in rows.iter().zip(result.matrix.iter()) {
        fn rightmost_with_tokens(node: &AlignmentRow) -> Option<&AlignmentRow> {
            if !node.value.tokens.is_empty() {
                return Some(node);
            }
            node.children
                .iter()
                .rev()
                .filter(|c| c.value.total_width() > 0)
                .find_map(|c| rightmost_with_tokens(c))
        }
        if let Some(rightmost) = rightmost_with_tokens(dense) {
            let epilog = rightmost.value.tokens.end..row.range.end;
            let epilog_width = effective_cell_width(&ftokens[epilog], source);
            if total_column_width + epilog_width > column_limit {
                return result;
            }
        }
    }

    // The proposed alignment fits; compute per-row spacing mutations.
    for dense in &result.matrix {
        let mut actions = Vec::new();
        let mut accrued = 0usize;
        compute_aligned_row_cell_spacings(
            &column_configs,
            &column_properties,
            dense,
            &mut actions,
            &mut accrued,
        );
        result.align_actions_2d.push(actions);
    }
    result
}

/// Apply pre-calculated spacings: each aligned row becomes an
/// `AlreadyFormatted` line of `Inline` cells, and the cell-leading tokens'
/// spacing is rewritten.
fn apply_alignment(
    data: &GroupAlignmentData,
    rows: &[RowInfo],
    parent: &mut TokenPartitionTree,
    ftokens: &mut [PreFormatToken],
) {
    for (row, actions) in rows.iter().zip(data.align_actions_2d.iter()) {
        let partition = &mut parent.children[row.child];
        partition.children.clear();
        if actions.is_empty() {
            continue;
        }
        partition.value.policy = PartitionPolicy::AlreadyFormatted;
        let range = partition.value.tokens.clone();

        let mut boundaries: Vec<(usize, usize)> = Vec::new(); // (start, spacing)
        if actions.first().map(|a| a.ftoken) != Some(range.start) {
            boundaries.push((range.start, 0));
        }
        for action in actions {
            ftokens[action.ftoken].before.spaces_required = action.new_before_spacing;
            ftokens[action.ftoken].before.break_decision = SpacingOptions::AppendAligned;
            boundaries.push((action.ftoken, action.new_before_spacing));
        }
        for (i, &(start, spacing)) in boundaries.iter().enumerate() {
            let end = boundaries
                .get(i + 1)
                .map(|&(s, _)| s)
                .unwrap_or(range.end);
            partition.children.push(TokenPartitionTree::leaf(UnwrappedLine::new(
                spacing,
                start..end,
                PartitionPolicy::Inline,
            )));
        }
    }
}

/// Max positive difference between original spacing and flush-left
/// spacing, over every non-leading token of every row.
fn flush_left_spacing_differences(
    rows: &[RowInfo],
    ftokens: &[PreFormatToken],
    source: &str,
) -> i64 {
    let mut max_excess = 0i64;
    for row in rows {
        for idx in row.range.clone().skip(1) {
            max_excess = max_excess.max(ftokens[idx].excess_spaces(source));
        }
    }
    max_excess
}

/// Rewrite each partition in `children[child_indices]` into an
/// `AlreadyFormatted` tree whose `Inline` cells carry the original
/// inter-token spacing, splitting at original newlines.
pub fn format_using_original_spacing(
    parent: &mut TokenPartitionTree,
    child_indices: &[usize],
    ftokens: &[PreFormatToken],
    source: &str,
) {
    for &index in child_indices {
        let partition = &mut parent.children[index];
        partition.children.clear();
        let range = partition.value.tokens.clone();
        if range.is_empty() {
            partition.value.policy = PartitionPolicy::AlreadyFormatted;
            continue;
        }
        let indentation = partition.value.indentation;

        let mut lines: Vec<TokenPartitionTree> = Vec::new();
        let mut line = TokenPartitionTree {
            value: UnwrappedLine::new(
                indentation,
                range.start..range.start,
                PartitionPolicy::AlreadyFormatted,
            ),
            children: Vec::new(),
        };
        for idx in range.clone() {
            let ftoken = &ftokens[idx];
            let ws = ftoken.original_leading_spaces(source);
            let mut spacing = ws.len();
            if idx != range.start {
                if let Some(newline) = ws.rfind('\n') {
                    // Close the current line and open a new one.
                    line.value.tokens.end = idx;
                    lines.push(line);
                    line = TokenPartitionTree {
                        value: UnwrappedLine::new(
                            0,
                            idx..idx,
                            PartitionPolicy::AlreadyFormatted,
                        ),
                        children: Vec::new(),
                    };
                    spacing = ws.len() - newline - 1;
                }
            } else {
                spacing = 0;
            }
            line.children.push(TokenPartitionTree::leaf(UnwrappedLine::new(
                spacing,
                idx..idx + 1,
                PartitionPolicy::Inline,
            )));
        }
        line.value.tokens.end = range.end;
        lines.push(line);

        if lines.len() == 1 {
            let only = lines.pop().expect("one line");
            partition.children = only.children;
            partition.value.policy = PartitionPolicy::AlreadyFormatted;
        } else {
            partition.children = lines;
            partition.value.policy = PartitionPolicy::AlwaysExpand;
        }
        partition.verify_ranges();
    }
}

/// Align one group of sibling partitions under `parent`.
///
/// `child_indices` selects the rows (already filtered of ignored rows).
/// Depending on `policy` this aligns, flushes left (no-op), preserves the
/// original spacing, or infers the user's intent from the dry run.
#[allow(clippy::too_many_arguments)]
pub fn align_partition_group(
    parent: &mut TokenPartitionTree,
    child_indices: &[usize],
    scanner: &AlignmentCellScanner,
    mut policy: AlignmentPolicy,
    style: &FormatStyle,
    ftokens: &mut [PreFormatToken],
    source: &str,
) {
    let rows: Vec<RowInfo> = child_indices
        .iter()
        .map(|&i| RowInfo {
            child: i,
            range: parent.children[i].value.tokens.clone(),
            indentation: parent.children[i].value.indentation,
        })
        .collect();
    let lines: Vec<UnwrappedLine> = child_indices
        .iter()
        .map(|&i| parent.children[i].value.clone())
        .collect();

    let data = match policy {
        AlignmentPolicy::Align | AlignmentPolicy::InferUserIntent => {
            calculate_alignment_spacings(
                &rows,
                &lines,
                scanner,
                style.column_limit,
                ftokens,
                source,
            )
        }
        _ => GroupAlignmentData::default(),
    };

    if policy == AlignmentPolicy::InferUserIntent {
        policy = infer_user_intended_policy(&data, &rows, style, ftokens, source);
    }

    match policy {
        AlignmentPolicy::Align => {
            if !data.align_actions_2d.is_empty() {
                apply_alignment(&data, &rows, parent, ftokens);
            } else {
                // Alignment was refused (overflow); spacing must stay
                // untouched.
                format_using_original_spacing(parent, child_indices, ftokens, source);
            }
        }
        AlignmentPolicy::FlushLeft => {
            // The downstream renderer already packs flush left.
        }
        AlignmentPolicy::Preserve | AlignmentPolicy::InferUserIntent => {
            format_using_original_spacing(parent, child_indices, ftokens, source);
        }
    }
}

/// Priority-ordered heuristics guessing whether the author wanted
/// alignment (the `InferUserIntent` policy).
fn infer_user_intended_policy(
    data: &GroupAlignmentData,
    rows: &[RowInfo],
    style: &FormatStyle,
    ftokens: &[PreFormatToken],
    source: &str,
) -> AlignmentPolicy {
    if !data.align_actions_2d.is_empty() {
        let align_flush_diff = data.max_absolute_align_vs_flush_left_difference(ftokens);
        if align_flush_diff <= style.align_force_threshold as i64 {
            return AlignmentPolicy::Align;
        }
    }
    let max_excess_spaces = flush_left_spacing_differences(rows, ftokens, source);
    if max_excess_spaces <= style.flush_left_threshold as i64 {
        return AlignmentPolicy::FlushLeft;
    }
    if !data.align_actions_2d.is_empty()
        && max_excess_spaces >= style.align_trigger_threshold as i64
    {
        return AlignmentPolicy::Align;
    }
    AlignmentPolicy::Preserve
}

#[cfg(test)]
mod tests {
    use super::*;
    use svfmt_parser::{NodeKind, Span, Token, TokenKind};

    /// Build ftokens for rows of space-separated words; returns the source
    /// and per-row ftoken ranges. Every word needs 1 space before it
    /// (except row starts).
    fn build_rows(rows: &[&[&str]]) -> (String, Vec<PreFormatToken>, Vec<Range<usize>>) {
        let mut source = String::new();
        let mut ftokens = Vec::new();
        let mut ranges = Vec::new();
        for row in rows {
            let row_start = ftokens.len();
            for (i, word) in row.iter().enumerate() {
                let ws_start = source.len();
                if i > 0 {
                    source.push(' ');
                } else if !source.is_empty() {
                    source.push('\n');
                }
                let start = source.len();
                source.push_str(word);
                let token = Token::new(TokenKind::Identifier, Span::new(start, source.len()));
                let mut f = PreFormatToken::new(token, Span::new(ws_start, start));
                f.before.spaces_required = if i > 0 { 1 } else { 0 };
                ftokens.push(f);
            }
            ranges.push(row_start..ftokens.len());
        }
        (source, ftokens, ranges)
    }

    /// One column per word position, identified by path `[i]`.
    fn positional_scanner<'a>(
        ftokens: &'a [PreFormatToken],
    ) -> impl Fn(&UnwrappedLine) -> ColumnPositionTree + 'a {
        move |line: &UnwrappedLine| {
            let mut root = column_tree_root();
            for (i, idx) in line.tokens.clone().enumerate() {
                root.children.push(VTree::new(ColumnPositionEntry {
                    path: vec![i as i32],
                    starting_offset: ftokens[idx].token.span.start,
                    properties: AlignmentColumnProperties::default(),
                }));
            }
            root
        }
    }

    fn make_parent(ranges: &[Range<usize>]) -> TokenPartitionTree {
        let children: Vec<TokenPartitionTree> = ranges
            .iter()
            .map(|r| {
                TokenPartitionTree::leaf(
                    UnwrappedLine::new(0, r.clone(), PartitionPolicy::FitOnLineElseExpand)
                        .with_origin(NodeKind::PortDeclaration),
                )
            })
            .collect();
        TokenPartitionTree {
            value: UnwrappedLine::new(
                0,
                ranges.first().map(|r| r.start).unwrap_or(0)
                    ..ranges.last().map(|r| r.end).unwrap_or(0),
                PartitionPolicy::AlwaysExpand,
            ),
            children,
        }
    }

    fn aligned_spacings(parent: &TokenPartitionTree, ftokens: &[PreFormatToken]) -> Vec<Vec<usize>> {
        parent
            .children
            .iter()
            .map(|row| {
                row.value
                    .tokens
                    .clone()
                    .map(|i| ftokens[i].before.spaces_required)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_align_pads_to_column_widths() {
        let (source, mut ftokens, ranges) =
            build_rows(&[&["input", "logic", "a"], &["output", "wire", "bbb"]]);
        let mut parent = make_parent(&ranges);
        let ftokens_snapshot = ftokens.clone();
        let scanner = positional_scanner(&ftokens_snapshot);
        align_partition_group(
            &mut parent,
            &[0, 1],
            &scanner,
            AlignmentPolicy::Align,
            &FormatStyle::default(),
            &mut ftokens,
            &source,
        );
        // Column widths: max("input","output")=6, max("logic","wire")=5.
        // Row 0: spacing before "logic" = col-0 padding (1) + border (1);
        // row 1: spacing before "bbb" = col-1 padding (1) + border (1).
        let spacings = aligned_spacings(&parent, &ftokens);
        assert_eq!(spacings[0], vec![0, 2, 1]);
        assert_eq!(spacings[1], vec![0, 1, 2]);
        // Rows became AlreadyFormatted lines of Inline cells.
        for child in &parent.children {
            assert_eq!(child.value.policy, PartitionPolicy::AlreadyFormatted);
            assert!(child
                .children
                .iter()
                .all(|c| c.value.policy == PartitionPolicy::Inline));
        }
    }

    #[test]
    fn test_align_handles_missing_columns() {
        // Second row lacks the middle column entirely.
        let (source, mut ftokens, ranges) =
            build_rows(&[&["input", "logic", "a"], &["output", "cc"]]);
        let mut parent = make_parent(&ranges);
        // Scanner: row 0 -> columns [0],[1],[2]; row 1 -> [0],[2].
        let ft = ftokens.clone();
        let scanner = move |line: &UnwrappedLine| {
            let mut root = column_tree_root();
            let idxs: Vec<usize> = line.tokens.clone().collect();
            let paths: Vec<i32> = if idxs.len() == 3 { vec![0, 1, 2] } else { vec![0, 2] };
            for (slot, idx) in paths.into_iter().zip(idxs) {
                root.children.push(VTree::new(ColumnPositionEntry {
                    path: vec![slot],
                    starting_offset: ft[idx].token.span.start,
                    properties: AlignmentColumnProperties::default(),
                }));
            }
            root
        };
        align_partition_group(
            &mut parent,
            &[0, 1],
            &scanner,
            AlignmentPolicy::Align,
            &FormatStyle::default(),
            &mut ftokens,
            &source,
        );
        let spacings = aligned_spacings(&parent, &ftokens);
        // Row 1's "cc" must land in column 2: the unused middle column
        // contributes its full width (border 1 + "logic" 5) to the accrued
        // spaces, plus column 2's own border.
        assert_eq!(spacings[0], vec![0, 2, 1]);
        assert_eq!(spacings[1], vec![0, 7]);
    }

    #[test]
    fn test_alignment_fallback_over_column_limit() {
        let (source, mut ftokens, ranges) = build_rows(&[
            &["input", "logic", "aaaaaaaaaa"],
            &["output", "wire", "bbbbbbbbbb"],
        ]);
        let before = ftokens.clone();
        let mut parent = make_parent(&ranges);
        let scanner = positional_scanner(&before);
        let style = FormatStyle { column_limit: 10, ..FormatStyle::default() };
        align_partition_group(
            &mut parent,
            &[0, 1],
            &scanner,
            AlignmentPolicy::Align,
            &style,
            &mut ftokens,
            &source,
        );
        // Spacing decisions untouched; rows fell back to preservation.
        for (a, b) in before.iter().zip(ftokens.iter()) {
            assert_eq!(a.before.spaces_required, b.before.spaces_required);
        }
        for child in &parent.children {
            assert!(matches!(
                child.value.policy,
                PartitionPolicy::AlreadyFormatted | PartitionPolicy::AlwaysExpand
            ));
        }
    }

    #[test]
    fn test_infer_intent_flush_left_when_close() {
        // Original spacing is within the flush-left threshold.
        let (source, mut ftokens, ranges) =
            build_rows(&[&["input", "logic", "a"], &["output", "wire", "bb"]]);
        let mut parent = make_parent(&ranges);
        let ft = ftokens.clone();
        let scanner = positional_scanner(&ft);
        align_partition_group(
            &mut parent,
            &[0, 1],
            &scanner,
            AlignmentPolicy::InferUserIntent,
            &FormatStyle { align_force_threshold: 0, ..FormatStyle::default() },
            &mut ftokens,
            &source,
        );
        // Max excess over flush-left is 0 (single spaces) -> flush left:
        // nothing rewritten.
        let spacings = aligned_spacings(&parent, &ftokens);
        assert_eq!(spacings[0], vec![0, 1, 1]);
        assert_eq!(spacings[1], vec![0, 1, 1]);
    }

    #[test]
    fn test_infer_intent_aligns_when_small_delta() {
        let (source, mut ftokens, ranges) =
            build_rows(&[&["input", "logic", "a"], &["output", "wire", "bb"]]);
        let mut parent = make_parent(&ranges);
        let ft = ftokens.clone();
        let scanner = positional_scanner(&ft);
        align_partition_group(
            &mut parent,
            &[0, 1],
            &scanner,
            AlignmentPolicy::InferUserIntent,
            &FormatStyle::default(),
            &mut ftokens,
            &source,
        );
        // D_align = 1 ("input"->"logic" cell padding) <= 2 -> force align.
        let spacings = aligned_spacings(&parent, &ftokens);
        assert_eq!(spacings[0], vec![0, 2, 1]);
    }

    #[test]
    fn test_delimiter_column_aligns_to_last_row() {
        // Rows resembling case items: value ':' body, with the longest
        // value in the last row.
        let (source, mut ftokens, ranges) =
            build_rows(&[&["short", ":", "x"], &["longest_value", ":", "y"]]);
        let mut parent = make_parent(&ranges);
        let ft = ftokens.clone();
        let scanner = move |line: &UnwrappedLine| {
            let mut root = column_tree_root();
            for (i, idx) in line.tokens.clone().enumerate() {
                let mut props = AlignmentColumnProperties::default();
                if i == 1 {
                    props = props.delimiter();
                }
                root.children.push(VTree::new(ColumnPositionEntry {
                    path: vec![i as i32],
                    starting_offset: ft[idx].token.span.start,
                    properties: props,
                }));
            }
            root
        };
        align_partition_group(
            &mut parent,
            &[0, 1],
            &scanner,
            AlignmentPolicy::Align,
            &FormatStyle::default(),
            &mut ftokens,
            &source,
        );
        // The delimiter column collapsed: ':' binds directly after each
        // value, no padding to the longest value.
        let spacings = aligned_spacings(&parent, &ftokens);
        assert_eq!(spacings[0][1], 0);
        assert_eq!(spacings[1][1], 0);
    }

    #[test]
    fn test_format_using_original_spacing_splits_at_newlines() {
        let source = "aa  bb\n   cc";
        let t = |s: usize, e: usize| Token::new(TokenKind::Identifier, Span::new(s, e));
        let mut f0 = PreFormatToken::new(t(0, 2), Span::new(0, 0));
        f0.before.spaces_required = 0;
        let mut f1 = PreFormatToken::new(t(4, 6), Span::new(2, 4));
        f1.before.spaces_required = 1;
        let mut f2 = PreFormatToken::new(t(10, 12), Span::new(6, 10));
        f2.before.spaces_required = 1;
        let ftokens = vec![f0, f1, f2];
        let mut parent = TokenPartitionTree {
            value: UnwrappedLine::new(0, 0..3, PartitionPolicy::AlwaysExpand),
            children: vec![TokenPartitionTree::leaf(UnwrappedLine::new(
                2,
                0..3,
                PartitionPolicy::FitOnLineElseExpand,
            ))],
        };
        format_using_original_spacing(&mut parent, &[0], &ftokens, source);
        let partition = &parent.children[0];
        // Two lines: "aa  bb" and "   cc".
        assert_eq!(partition.value.policy, PartitionPolicy::AlwaysExpand);
        assert_eq!(partition.children.len(), 2);
        let first = &partition.children[0];
        assert_eq!(first.children.len(), 2);
        assert_eq!(first.children[1].value.indentation, 2); // "aa" -> 2 spaces -> "bb"
        let second = &partition.children[1];
        assert_eq!(second.children[0].value.indentation, 3);
    }
}
