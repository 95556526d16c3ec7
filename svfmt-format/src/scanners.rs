//! Alignment cell scanners for the aligned SystemVerilog constructs.
//!
//!     Each scanner maps one row's syntax node to a sparse column-position
//!     tree. Columns are keyed by grammar slot — the position a construct
//!     occupies in the declaration shape — so rows missing an optional
//!     construct (no direction keyword, no dimensions, no initializer)
//!     still collate correctly against their neighbors.

use std::collections::HashMap;

use svfmt_parser::{NodeKind, Syntax, SyntaxNode, TokenKind};

use crate::align::{
    column_tree_root, AlignmentColumnProperties, ColumnPositionEntry, ColumnPositionTree,
};
use crate::partition::UnwrappedLine;
use crate::style::{AlignmentPolicy, FormatStyle};
use crate::vtree::VTree;

/// Index from (node kind, starting byte offset) to the syntax node, used
/// to recover each row's syntax from its token range.
pub struct SyntaxNodeIndex<'a> {
    map: HashMap<(NodeKind, usize), &'a SyntaxNode>,
}

impl<'a> SyntaxNodeIndex<'a> {
    pub fn build(root: &'a Syntax) -> Self {
        let mut map = HashMap::new();
        fn walk<'a>(tree: &'a Syntax, map: &mut HashMap<(NodeKind, usize), &'a SyntaxNode>) {
            if let Syntax::Node(node) = tree {
                if let Some(first) = tree.leftmost_leaf() {
                    map.entry((node.tag, first.span.start)).or_insert(node);
                }
                for child in &node.children {
                    walk(child, map);
                }
            }
        }
        walk(root, &mut map);
        SyntaxNodeIndex { map }
    }

    pub fn lookup(&self, kind: NodeKind, start_offset: usize) -> Option<&'a SyntaxNode> {
        self.map.get(&(kind, start_offset)).copied()
    }
}

fn push_column(
    root: &mut ColumnPositionTree,
    slot: i32,
    starting_offset: usize,
    properties: AlignmentColumnProperties,
) {
    // Only the first token of a slot reserves the column.
    if root
        .children
        .iter()
        .any(|c| c.value.path == vec![slot])
    {
        return;
    }
    root.children.push(VTree::new(ColumnPositionEntry {
        path: vec![slot],
        starting_offset,
        properties,
    }));
}

fn leaf_kind(child: &Syntax) -> Option<TokenKind> {
    match child {
        Syntax::Leaf(t) => Some(t.kind),
        Syntax::Node(_) => None,
    }
}

fn is_type_keyword(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Wire
            | TokenKind::Logic
            | TokenKind::Reg
            | TokenKind::OtherKeyword
            | TokenKind::Packed
            | TokenKind::Enum
            | TokenKind::Struct
            | TokenKind::Union
    )
}

/// Declaration-shaped rows: port declarations, net/variable declarations,
/// parameter declarations, struct/union members.
///
/// Slots: 0 direction/qualifier keywords, 1 type, 2 packed dimensions,
/// 3 declarator, 4 unpacked dimensions, 5 `=`, 6 initializer.
pub fn declaration_columns(node: &SyntaxNode) -> ColumnPositionTree {
    let mut root = column_tree_root();
    // The last identifier leaf is the declarator; identifiers before it
    // belong to the type.
    let last_identifier = node
        .children
        .iter()
        .rposition(|c| leaf_kind(c) == Some(TokenKind::Identifier));
    let mut seen_equals = false;
    for (i, child) in node.children.iter().enumerate() {
        let Some(start) = child.leftmost_leaf().map(|t| t.span.start) else { continue };
        let props = AlignmentColumnProperties::default();
        match child {
            Syntax::Leaf(t) => match t.kind {
                TokenKind::Input
                | TokenKind::Output
                | TokenKind::Inout
                | TokenKind::Parameter
                | TokenKind::Localparam
                | TokenKind::Typedef => push_column(&mut root, 0, start, props),
                k if is_type_keyword(k) => push_column(&mut root, 1, start, props),
                TokenKind::Identifier => {
                    if Some(i) == last_identifier {
                        push_column(&mut root, 3, start, props);
                    } else {
                        push_column(&mut root, 1, start, props);
                    }
                }
                TokenKind::Equals => {
                    seen_equals = true;
                    push_column(&mut root, 5, start, props);
                }
                _ => {}
            },
            Syntax::Node(n) => match n.tag {
                NodeKind::PackedDimensions => push_column(&mut root, 2, start, props),
                NodeKind::UnpackedDimensions => push_column(&mut root, 4, start, props),
                NodeKind::EnumType | NodeKind::StructType => {
                    push_column(&mut root, 1, start, props)
                }
                _ => {
                    if seen_equals {
                        push_column(&mut root, 6, start, props);
                    }
                }
            },
        }
    }
    root
}

/// Named port/parameter connections `.name(expression)`.
///
/// Slots: 0 the `.name` reference, 1 the parenthesized actual.
pub fn named_port_columns(node: &SyntaxNode) -> ColumnPositionTree {
    let mut root = column_tree_root();
    if let Some(first) = node.children.first().and_then(|c| c.leftmost_leaf()) {
        push_column(&mut root, 0, first.span.start, AlignmentColumnProperties::default());
    }
    for child in &node.children {
        if let Syntax::Node(n) = child {
            if n.tag == NodeKind::ParenGroup {
                if let Some(t) = child.leftmost_leaf() {
                    push_column(&mut root, 1, t.span.start, AlignmentColumnProperties::default());
                }
            }
        }
    }
    root
}

/// Case items `value[, value] : statement`.
///
/// Slots: 0 the pattern, 1 the `:` delimiter, 2 the statement. The `:`
/// column participates in align-to-last-row semantics.
pub fn case_item_columns(node: &SyntaxNode) -> ColumnPositionTree {
    let mut root = column_tree_root();
    let mut after_colon = false;
    for child in &node.children {
        let Some(start) = child.leftmost_leaf().map(|t| t.span.start) else { continue };
        if leaf_kind(child) == Some(TokenKind::Colon) {
            push_column(
                &mut root,
                1,
                start,
                AlignmentColumnProperties::default().delimiter(),
            );
            after_colon = true;
        } else if after_colon {
            push_column(
                &mut root,
                2,
                start,
                AlignmentColumnProperties::default().border(1),
            );
        } else {
            push_column(&mut root, 0, start, AlignmentColumnProperties::default());
        }
    }
    root
}

/// Assignment-shaped rows: `assign lhs = rhs;`, `lhs <= rhs;`.
///
/// Slots: 0 the `assign` keyword (when present), 1 the left-hand side,
/// 2 the operator, 3 the right-hand side.
pub fn assignment_columns(node: &SyntaxNode) -> ColumnPositionTree {
    let mut root = column_tree_root();
    // ContinuousAssign wraps an AssignmentStatement; flatten one level.
    let mut slot_base = 0;
    let mut target = node;
    if node.tag == NodeKind::ContinuousAssign {
        if let Some(first) = node.children.first().and_then(|c| c.leftmost_leaf()) {
            push_column(&mut root, 0, first.span.start, AlignmentColumnProperties::default());
        }
        slot_base = 1;
        if let Some(inner) = node.children.iter().find_map(|c| match c {
            Syntax::Node(n) if n.tag == NodeKind::AssignmentStatement => Some(n),
            _ => None,
        }) {
            target = inner;
        }
    }
    let mut after_op = false;
    for child in &target.children {
        let Some(start) = child.leftmost_leaf().map(|t| t.span.start) else { continue };
        match leaf_kind(child) {
            Some(TokenKind::Equals) | Some(TokenKind::AssignOp) | Some(TokenKind::LessEq) => {
                push_column(
                    &mut root,
                    slot_base + 1,
                    start,
                    AlignmentColumnProperties::default().border(1),
                );
                after_op = true;
            }
            Some(TokenKind::Semicolon) => {}
            _ => {
                let slot = if after_op { slot_base + 2 } else { slot_base };
                push_column(
                    &mut root,
                    slot,
                    start,
                    AlignmentColumnProperties::default().border(if after_op { 1 } else { 0 }),
                );
            }
        }
    }
    root
}

/// Enumeration entries `NAME = value`.
pub fn enum_name_columns(node: &SyntaxNode) -> ColumnPositionTree {
    let mut root = column_tree_root();
    let mut after_equals = false;
    for child in &node.children {
        let Some(start) = child.leftmost_leaf().map(|t| t.span.start) else { continue };
        match leaf_kind(child) {
            Some(TokenKind::Identifier) if !after_equals => {
                push_column(&mut root, 0, start, AlignmentColumnProperties::default());
            }
            Some(TokenKind::Equals) => {
                after_equals = true;
                push_column(
                    &mut root,
                    1,
                    start,
                    AlignmentColumnProperties::default().border(1),
                );
            }
            _ => {
                if after_equals {
                    push_column(
                        &mut root,
                        2,
                        start,
                        AlignmentColumnProperties::default().border(1),
                    );
                }
            }
        }
    }
    root
}

/// Alignment handler for one construct kind: which rows it claims, how to
/// scan them, and which style policy governs the group.
pub struct AlignmentHandler {
    pub origin: NodeKind,
    pub policy: AlignmentPolicy,
}

/// The constructs the aligner recognizes, with their per-style policies.
pub fn alignment_handlers(style: &FormatStyle) -> Vec<AlignmentHandler> {
    vec![
        AlignmentHandler {
            origin: NodeKind::PortDeclaration,
            policy: style.port_declarations_alignment,
        },
        AlignmentHandler {
            origin: NodeKind::ActualNamedPort,
            policy: style.named_port_alignment,
        },
        AlignmentHandler {
            origin: NodeKind::DataDeclaration,
            policy: style.net_variable_alignment,
        },
        AlignmentHandler {
            origin: NodeKind::ParameterDeclaration,
            policy: style.formal_parameters_alignment,
        },
        AlignmentHandler {
            origin: NodeKind::CaseItem,
            policy: style.case_items_alignment,
        },
        AlignmentHandler {
            origin: NodeKind::ContinuousAssign,
            policy: style.assignment_statement_alignment,
        },
        AlignmentHandler {
            origin: NodeKind::AssignmentStatement,
            policy: style.assignment_statement_alignment,
        },
        AlignmentHandler {
            origin: NodeKind::EnumName,
            policy: style.enum_entries_alignment,
        },
    ]
}

/// Scan one row: resolve its syntax node and dispatch by origin kind.
pub fn scan_row(
    line: &UnwrappedLine,
    first_token_offset: usize,
    index: &SyntaxNodeIndex<'_>,
) -> ColumnPositionTree {
    let Some(origin) = line.origin else {
        return column_tree_root();
    };
    let Some(node) = index.lookup(origin, first_token_offset) else {
        return column_tree_root();
    };
    match origin {
        NodeKind::PortDeclaration
        | NodeKind::DataDeclaration
        | NodeKind::ParameterDeclaration => declaration_columns(node),
        NodeKind::ActualNamedPort => named_port_columns(node),
        NodeKind::CaseItem | NodeKind::CasePatternItem | NodeKind::PropertyCaseItem => {
            case_item_columns(node)
        }
        NodeKind::ContinuousAssign | NodeKind::AssignmentStatement => {
            assignment_columns(node)
        }
        NodeKind::EnumName => enum_name_columns(node),
        _ => column_tree_root(),
    }
}
