//! Partition construction.
//!
//!     Walks the syntax tree and produces the token partition tree: one
//!     unwrapped line per declaration, statement, or list entry, child
//!     partitions for bodies at one deeper indentation level, and leaf
//!     rows for the list shapes the aligner cares about (ports, named
//!     connections, case items, enum entries).
//!
//!     Comments are not syntax-tree leaves, so the builder threads a
//!     cursor through the format-token array: comments between items
//!     become their own partitions, and a comment trailing an item on the
//!     same line is absorbed into that item's last line.

use std::collections::HashMap;
use std::ops::Range;

use svfmt_parser::{NodeKind, Syntax, SyntaxNode, TextStructure};

use crate::format_token::PreFormatToken;
use crate::partition::{PartitionPolicy, TokenPartitionTree, UnwrappedLine};
use crate::style::{FormatStyle, IndentationStyle};

/// Build the partition tree covering every format token exactly once.
pub fn build_partitions(
    structure: &TextStructure,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
) -> TokenPartitionTree {
    let mut offset_to_index = HashMap::new();
    for (i, f) in ftokens.iter().enumerate() {
        offset_to_index.insert(f.token.span.start, i);
    }
    let mut unwrapper = Unwrapper {
        ftokens,
        source,
        style,
        offset_to_index,
        cursor: 0,
    };
    let mut children = Vec::new();
    if let Some(Syntax::Node(root)) = structure.syntax_tree() {
        let items: Vec<&Syntax> = root.children.iter().collect();
        unwrapper.emit_items(&items, 0, &mut children);
    }
    unwrapper.flush_comments_up_to(ftokens.len(), 0, &mut children);

    let mut tree = TokenPartitionTree {
        value: UnwrappedLine::new(0, 0..ftokens.len(), PartitionPolicy::AlwaysExpand),
        children,
    };
    if tree.children.is_empty() {
        tree.value.tokens = 0..ftokens.len();
    } else {
        tree.update_range_from_children();
        // Any leading tokens not covered (none expected) would break the
        // invariants; verify early.
        tree.verify_ranges();
    }
    tree
}

struct Unwrapper<'a> {
    ftokens: &'a [PreFormatToken],
    source: &'a str,
    style: &'a FormatStyle,
    offset_to_index: HashMap<usize, usize>,
    cursor: usize,
}

impl<'a> Unwrapper<'a> {
    /// Format-token range a subtree covers; `None` for empty subtrees.
    fn ft_range(&self, tree: &Syntax) -> Option<Range<usize>> {
        let left = tree.leftmost_leaf()?;
        let right = tree.rightmost_leaf()?;
        let start = *self.offset_to_index.get(&left.span.start)?;
        let end = *self.offset_to_index.get(&right.span.start)? + 1;
        Some(start..end)
    }

    /// True when any token after the first in `range` starts a new line in
    /// the original source.
    fn original_multiline(&self, range: &Range<usize>) -> bool {
        self.ftokens[range.start..range.end]
            .iter()
            .skip(1)
            .any(|f| f.original_leading_spaces(self.source).contains('\n'))
    }

    fn leaf(&self, indent: usize, range: Range<usize>) -> TokenPartitionTree {
        TokenPartitionTree::leaf(UnwrappedLine::new(
            indent,
            range,
            PartitionPolicy::FitOnLineElseExpand,
        ))
    }

    fn list_indent(&self, base: usize, kind: IndentationStyle) -> usize {
        base + match kind {
            IndentationStyle::Wrap => self.style.wrap_spaces,
            IndentationStyle::Indent => self.style.indentation_spaces,
        }
    }

    /// Emit partitions for comments (and anything else uncovered) before
    /// format-token index `target`.
    fn flush_comments_up_to(
        &mut self,
        target: usize,
        indent: usize,
        out: &mut Vec<TokenPartitionTree>,
    ) {
        while self.cursor < target {
            let start = self.cursor;
            let mut end = start + 1;
            // Group run-on comment tokens sharing a line.
            while end < target
                && !self.ftokens[end]
                    .original_leading_spaces(self.source)
                    .contains('\n')
            {
                end += 1;
            }
            let mut line = UnwrappedLine::new(indent, start..end, PartitionPolicy::FlushLeft);
            line.origin = Some(NodeKind::CommentGroup);
            out.push(TokenPartitionTree::leaf(line));
            self.cursor = end;
        }
    }

    /// Absorb same-line trailing comments into the partition's last line.
    fn attach_trailing_comments(&mut self, partition: &mut TokenPartitionTree) {
        let mut end = self.cursor;
        while end < self.ftokens.len()
            && self.ftokens[end].token.kind.is_comment()
            && !self.ftokens[end]
                .original_leading_spaces(self.source)
                .contains('\n')
        {
            end += 1;
        }
        if end == self.cursor {
            return;
        }
        fn extend(partition: &mut TokenPartitionTree, end: usize) {
            partition.value.tokens.end = end;
            if let Some(last) = partition.children.last_mut() {
                extend(last, end);
            }
        }
        extend(partition, end);
        self.cursor = end;
    }

    fn emit_items(&mut self, items: &[&Syntax], indent: usize, out: &mut Vec<TokenPartitionTree>) {
        for item in items {
            let Some(range) = self.ft_range(item) else { continue };
            self.flush_comments_up_to(range.start, indent, out);
            let mut partition = self.emit_item(item, indent);
            self.cursor = partition.value.tokens.end;
            self.attach_trailing_comments(&mut partition);
            out.push(partition);
        }
    }

    /// Format-token range covered by a node's leaves.
    fn node_ft_range(&self, node: &SyntaxNode) -> Option<Range<usize>> {
        let left = node.children.iter().find_map(|c| c.leftmost_leaf())?;
        let right = node.children.iter().rev().find_map(|c| c.rightmost_leaf())?;
        let start = *self.offset_to_index.get(&left.span.start)?;
        let end = *self.offset_to_index.get(&right.span.start)? + 1;
        Some(start..end)
    }

    fn emit_item(&mut self, item: &Syntax, indent: usize) -> TokenPartitionTree {
        let range = self.ft_range(item).expect("caller checked non-empty");
        let node = match item {
            Syntax::Leaf(_) => return self.leaf(indent, range),
            Syntax::Node(n) => n,
        };
        match node.tag {
            NodeKind::ModuleDeclaration
            | NodeKind::PackageDeclaration
            | NodeKind::ClassDeclaration
            | NodeKind::InterfaceDeclaration
            | NodeKind::FunctionDeclaration
            | NodeKind::TaskDeclaration
            | NodeKind::PropertyDeclaration
            | NodeKind::SequenceDeclaration => self.emit_block_declaration(node, range, indent),
            NodeKind::ProceduralBlock
            | NodeKind::ConditionalStatement
            | NodeKind::ForLoop
            | NodeKind::ForeachLoop
            | NodeKind::WhileLoop => self.emit_statement_with_blocks(node, range, indent),
            NodeKind::SeqBlock => self.emit_seq_block(node, range, indent),
            NodeKind::CaseStatement => self.emit_case_statement(node, range, indent),
            NodeKind::ConstraintDeclaration => self.emit_constraint(node, range, indent),
            NodeKind::DataDeclaration
            | NodeKind::ParameterDeclaration
            | NodeKind::TypedefDeclaration => self.emit_data_declaration(node, range, indent),
            NodeKind::ExpressionStatement | NodeKind::ContinuousAssign => {
                let mut part = self.leaf(indent, range);
                part.value.origin = Some(self.statement_origin(node));
                part
            }
            _ => {
                let mut part = self.leaf(indent, range);
                part.value.origin = Some(node.tag);
                part
            }
        }
    }

    /// Origin used for alignment dispatch of single-line statements.
    fn statement_origin(&self, node: &SyntaxNode) -> NodeKind {
        if node.tag == NodeKind::ExpressionStatement {
            if let Some(Syntax::Node(inner)) = node.children.first() {
                if inner.tag == NodeKind::AssignmentStatement && inner.children.len() > 1 {
                    return NodeKind::AssignmentStatement;
                }
            }
        }
        node.tag
    }

    /// module/class/function/task/...: header, body items, end line.
    fn emit_block_declaration(
        &mut self,
        node: &SyntaxNode,
        range: Range<usize>,
        indent: usize,
    ) -> TokenPartitionTree {
        let mut children = Vec::new();
        let body_indent = indent + self.style.indentation_spaces;

        let mut iter = node.children.iter();
        // Header (first child for block declarations).
        if let Some(header) = iter.next() {
            if let Some(header_range) = self.ft_range(header) {
                let part = match header {
                    Syntax::Node(h)
                        if matches!(
                            h.tag,
                            NodeKind::ModuleHeader
                                | NodeKind::FunctionHeader
                                | NodeKind::TaskHeader
                        ) =>
                    {
                        self.emit_header(h, header_range, indent)
                    }
                    _ => self.leaf(indent, header_range),
                };
                self.cursor = part.value.tokens.end;
                children.push(part);
            }
        }

        // Body items up to the closing keyword leaf.
        let mut trailer_start = None;
        let mut body: Vec<&Syntax> = Vec::new();
        for child in iter {
            match child {
                Syntax::Leaf(t) if t.kind.is_end_keyword() => {
                    trailer_start = self.ft_range(child).map(|r| r.start);
                    break;
                }
                _ => body.push(child),
            }
        }
        self.emit_items(&body, body_indent, &mut children);

        // Closing keyword plus optional label, one line.
        if let Some(start) = trailer_start {
            self.flush_comments_up_to(start, body_indent, &mut children);
            children.push(self.leaf(indent, start..range.end));
        } else {
            self.flush_comments_up_to(range.end, body_indent, &mut children);
        }

        self.finish_node(range, indent, children, node.tag)
    }

    /// Header with an optionally expanded port/parameter list.
    fn emit_header(
        &mut self,
        header: &SyntaxNode,
        range: Range<usize>,
        indent: usize,
    ) -> TokenPartitionTree {
        // Find a port list with entries.
        let list = header.children.iter().find_map(|c| match c {
            Syntax::Node(n)
                if matches!(
                    n.tag,
                    NodeKind::PortDeclarationList | NodeKind::FormalParameterList
                ) =>
            {
                Some(n)
            }
            _ => None,
        });
        let Some(list) = list else {
            return self.leaf(indent, range);
        };
        let entries: Vec<&Syntax> = list
            .children
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Syntax::Node(n) if matches!(
                        n.tag,
                        NodeKind::PortDeclaration | NodeKind::ActualNamedPort
                    )
                )
            })
            .collect();
        if entries.is_empty() || !self.original_multiline(&range) {
            return self.leaf(indent, range);
        }

        let row_indent = self.list_indent(indent, self.style.port_declarations_indentation);
        let mut children = Vec::new();
        let first_entry_start = self
            .ft_range(entries[0])
            .expect("entry has tokens")
            .start;
        children.push(self.leaf(indent, range.start..first_entry_start));

        for (i, entry) in entries.iter().enumerate() {
            let start = self.ft_range(entry).expect("entry has tokens").start;
            let end = entries
                .get(i + 1)
                .and_then(|next| self.ft_range(next))
                .map(|r| r.start)
                .unwrap_or_else(|| {
                    // Up to the closing parenthesis of the list.
                    self.node_ft_range(list)
                        .map(|r| r.end - 1)
                        .unwrap_or(range.end)
                });
            let mut row = self.leaf(row_indent, start..end);
            if let Syntax::Node(n) = entry {
                row.value.origin = Some(n.tag);
            }
            children.push(row);
        }

        // Closing `)` through the end of the header (`;`).
        let last_end = children.last().expect("rows exist").value.tokens.end;
        children.push(self.leaf(indent, last_end..range.end));

        TokenPartitionTree {
            value: UnwrappedLine::new(indent, range, PartitionPolicy::AlwaysExpand),
            children,
        }
    }

    /// begin/fork block as a standalone statement.
    fn emit_seq_block(
        &mut self,
        node: &SyntaxNode,
        range: Range<usize>,
        indent: usize,
    ) -> TokenPartitionTree {
        let (open_end, close_start, body) = self.split_seq_block(node, &range);
        let mut children = vec![self.leaf(indent, range.start..open_end)];
        self.cursor = open_end;
        self.emit_items(&body, indent + self.style.indentation_spaces, &mut children);
        let close_start =
            close_start.max(children.last().expect("opening line").value.tokens.end);
        self.flush_comments_up_to(close_start, indent + self.style.indentation_spaces, &mut children);
        if close_start < range.end {
            children.push(self.leaf(indent, close_start..range.end));
        }
        self.finish_node(range, indent, children, node.tag)
    }

    /// Partition a begin/end block: returns (index after `begin` and its
    /// label, index of `end`, body items).
    fn split_seq_block<'n>(
        &self,
        node: &'n SyntaxNode,
        range: &Range<usize>,
    ) -> (usize, usize, Vec<&'n Syntax>) {
        let mut open_end = range.start + 1;
        let mut close_start = range.end;
        let mut body = Vec::new();
        let mut leading = true;
        for child in &node.children {
            match child {
                Syntax::Leaf(t) => {
                    if leading && !t.kind.is_end_keyword() {
                        // `begin`/`fork` and any `: label` stay on the
                        // opening line.
                        if let Some(&i) = self.offset_to_index.get(&t.span.start) {
                            open_end = i + 1;
                        }
                        continue;
                    }
                    leading = false;
                    if t.kind.is_end_keyword() {
                        if let Some(&i) = self.offset_to_index.get(&t.span.start) {
                            close_start = close_start.min(i);
                        }
                    }
                }
                Syntax::Node(_) => {
                    leading = false;
                    body.push(child);
                }
            }
        }
        (open_end, close_start.max(open_end), body)
    }

    /// if/for/foreach/while/initial-always: segments between blocks share a
    /// line with the adjacent `begin`/`end` keywords.
    fn emit_statement_with_blocks(
        &mut self,
        node: &SyntaxNode,
        range: Range<usize>,
        indent: usize,
    ) -> TokenPartitionTree {
        fn contains_block(node: &SyntaxNode) -> bool {
            node.children.iter().any(|c| match c {
                Syntax::Node(n) => match n.tag {
                    NodeKind::SeqBlock | NodeKind::CaseStatement => true,
                    NodeKind::ConditionalStatement => contains_block(n),
                    _ => false,
                },
                Syntax::Leaf(_) => false,
            })
        }
        if !contains_block(node) {
            let mut part = self.leaf(indent, range);
            part.value.origin = Some(node.tag);
            return part;
        }

        let mut children = Vec::new();
        let mut pending_start = range.start;
        for child in &node.children {
            match child {
                Syntax::Node(n) if n.tag == NodeKind::SeqBlock => {
                    let block_range = self.ft_range(child).expect("block has tokens");
                    let (open_end, close_start, body) =
                        self.split_seq_block(n, &block_range);
                    if pending_start < open_end {
                        children.push(self.leaf(indent, pending_start..open_end));
                    }
                    self.cursor = open_end;
                    self.emit_items(
                        &body,
                        indent + self.style.indentation_spaces,
                        &mut children,
                    );
                    let close_start = close_start
                        .max(children.last().map(|c| c.value.tokens.end).unwrap_or(open_end));
                    self.flush_comments_up_to(
                        close_start,
                        indent + self.style.indentation_spaces,
                        &mut children,
                    );
                    pending_start = close_start;
                }
                Syntax::Node(n) if n.tag == NodeKind::CaseStatement => {
                    let block_range = self.ft_range(child).expect("case has tokens");
                    if pending_start < block_range.start {
                        children.push(self.leaf(indent, pending_start..block_range.start));
                    }
                    self.cursor = block_range.start;
                    let part = self.emit_case_statement(n, block_range.clone(), indent);
                    self.cursor = part.value.tokens.end;
                    children.push(part);
                    pending_start = block_range.end;
                }
                // An else-if chain keeps its own block structure.
                Syntax::Node(n)
                    if n.tag == NodeKind::ConditionalStatement && contains_block(n) =>
                {
                    let block_range = self.ft_range(child).expect("nested if has tokens");
                    if pending_start < block_range.start {
                        children.push(self.leaf(indent, pending_start..block_range.start));
                    }
                    self.cursor = block_range.start;
                    let part =
                        self.emit_statement_with_blocks(n, block_range.clone(), indent);
                    self.cursor = part.value.tokens.end;
                    children.push(part);
                    pending_start = block_range.end;
                }
                _ => {}
            }
        }
        if pending_start < range.end {
            children.push(self.leaf(indent, pending_start..range.end));
        }
        self.finish_node(range, indent, children, node.tag)
    }

    fn emit_case_statement(
        &mut self,
        node: &SyntaxNode,
        range: Range<usize>,
        indent: usize,
    ) -> TokenPartitionTree {
        let items: Vec<&Syntax> = node
            .children
            .iter()
            .filter(|c| matches!(c, Syntax::Node(n) if n.tag == NodeKind::CaseItem))
            .collect();
        let Some(first_item_start) = items
            .first()
            .and_then(|i| self.ft_range(i))
            .map(|r| r.start)
        else {
            return self.leaf(indent, range);
        };
        let item_indent = indent + self.style.indentation_spaces;
        let mut children = vec![self.leaf(indent, range.start..first_item_start)];
        self.cursor = first_item_start;
        self.emit_items(&items, item_indent, &mut children);
        // `endcase` (when present) closes the partition on its own line.
        let close_start = (range.end - 1)
            .max(children.last().expect("items exist").value.tokens.end);
        self.flush_comments_up_to(close_start, item_indent, &mut children);
        if close_start < range.end {
            children.push(self.leaf(indent, close_start..range.end));
        }
        self.finish_node(range, indent, children, node.tag)
    }

    fn emit_constraint(
        &mut self,
        node: &SyntaxNode,
        range: Range<usize>,
        indent: usize,
    ) -> TokenPartitionTree {
        let block = node.children.iter().find_map(|c| match c {
            Syntax::Node(n) if n.tag == NodeKind::ConstraintBlock => Some(n),
            _ => None,
        });
        let Some(block) = block else {
            return self.leaf(indent, range);
        };
        let Some(block_range) = self.node_ft_range(block) else {
            return self.leaf(indent, range);
        };
        // Opening line runs through `{`.
        let open_end = block_range.start + 1;
        let mut children = vec![self.leaf(indent, range.start..open_end)];
        self.cursor = open_end;
        let body: Vec<&Syntax> = if block.children.len() > 2 {
            block.children[1..block.children.len() - 1].iter().collect()
        } else {
            Vec::new()
        };
        self.emit_items(&body, indent + self.style.indentation_spaces, &mut children);
        let close_start = (block_range.end - 1)
            .max(children.last().expect("opening line").value.tokens.end);
        self.flush_comments_up_to(close_start, indent + self.style.indentation_spaces, &mut children);
        if close_start < range.end {
            children.push(self.leaf(indent, close_start..range.end));
        }
        self.finish_node(range, indent, children, node.tag)
    }

    /// Declarations; a multiline enum body expands into aligned name rows.
    fn emit_data_declaration(
        &mut self,
        node: &SyntaxNode,
        range: Range<usize>,
        indent: usize,
    ) -> TokenPartitionTree {
        let enum_list = node.children.iter().find_map(|c| match c {
            Syntax::Node(n) if n.tag == NodeKind::EnumType => {
                n.children.iter().find_map(|e| match e {
                    Syntax::Node(l) if l.tag == NodeKind::EnumNameList => Some(l),
                    _ => None,
                })
            }
            _ => None,
        });
        let multiline = self.original_multiline(&range);
        if let (Some(list), true) = (enum_list, multiline) {
            let names: Vec<&Syntax> = list
                .children
                .iter()
                .filter(|c| matches!(c, Syntax::Node(n) if n.tag == NodeKind::EnumName))
                .collect();
            if let Some(first_start) = names.first().and_then(|n| self.ft_range(n)).map(|r| r.start)
            {
                let row_indent = indent + self.style.indentation_spaces;
                let mut children = vec![self.leaf(indent, range.start..first_start)];
                for (i, name) in names.iter().enumerate() {
                    let start = self.ft_range(name).expect("name tokens").start;
                    let end = names
                        .get(i + 1)
                        .and_then(|n| self.ft_range(n))
                        .map(|r| r.start)
                        .unwrap_or_else(|| {
                            self.ft_range(&Syntax::Node((*list).clone()))
                                .map(|r| r.end - 1)
                                .unwrap_or(range.end)
                        });
                    let mut row = self.leaf(row_indent, start..end);
                    row.value.origin = Some(NodeKind::EnumName);
                    children.push(row);
                }
                let last_end = children.last().expect("rows").value.tokens.end;
                children.push(self.leaf(indent, last_end..range.end));
                return self.finish_node(range, indent, children, node.tag);
            }
        }
        let mut part = self.leaf(indent, range);
        part.value.origin = Some(node.tag);
        part
    }

    /// Assemble a node partition, verifying the range invariants.
    fn finish_node(
        &mut self,
        range: Range<usize>,
        indent: usize,
        children: Vec<TokenPartitionTree>,
        origin: NodeKind,
    ) -> TokenPartitionTree {
        let mut line = UnwrappedLine::new(indent, range, PartitionPolicy::AlwaysExpand);
        line.origin = Some(origin);
        let mut tree = TokenPartitionTree { value: line, children };
        if tree.children.is_empty() {
            tree.value.policy = PartitionPolicy::FitOnLineElseExpand;
        } else {
            tree.update_range_from_children();
            tree.verify_ranges();
        }
        tree
    }
}
