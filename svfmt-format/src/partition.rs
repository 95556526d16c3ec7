//! Token partition tree.
//!
//!     The formatter partitions the pre-format token array into a tree of
//!     unwrapped lines. Leaves carry an indentation level, a token range,
//!     and a partition policy; an interior node's range is always exactly
//!     the concatenation of its children's ranges (no gaps, no overlaps).
//!
//!     Nodes own their children; there are no parent pointers. Operations
//!     that need to touch ancestors (the cross-depth leaf merges) locate
//!     leaves by path from the root.

use svfmt_parser::NodeKind;

/// Directive governing how the renderer may treat a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionPolicy {
    /// Pack tokens flush left on one line (the default).
    #[default]
    FlushLeft,
    /// A cell inside an already-formatted line; indentation is the exact
    /// space count before its first token.
    Inline,
    /// Spacing already decided (by alignment or preservation); emit as-is.
    AlreadyFormatted,
    /// Always render children on separate lines.
    AlwaysExpand,
    /// Render on one line when it fits, otherwise expand children.
    FitOnLineElseExpand,
    /// Append children onto the line while they fit, expanding the rest.
    AppendFittingSubpartitions,
}

/// A maximal sequence of format tokens intended for one output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrappedLine {
    /// Leading spaces for the first token (for `Inline` cells: the exact
    /// spacing before the cell).
    pub indentation: usize,
    /// Range into the pre-format token array.
    pub tokens: std::ops::Range<usize>,
    pub policy: PartitionPolicy,
    /// Syntactic origin, used to pick alignment handlers.
    pub origin: Option<NodeKind>,
}

impl UnwrappedLine {
    pub fn new(indentation: usize, tokens: std::ops::Range<usize>, policy: PartitionPolicy) -> Self {
        UnwrappedLine { indentation, tokens, policy, origin: None }
    }

    pub fn with_origin(mut self, origin: NodeKind) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Partition tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPartitionTree {
    pub value: UnwrappedLine,
    pub children: Vec<TokenPartitionTree>,
}

impl TokenPartitionTree {
    pub fn leaf(value: UnwrappedLine) -> Self {
        TokenPartitionTree { value, children: Vec::new() }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Recompute this node's range from its children (children must abut).
    pub fn update_range_from_children(&mut self) {
        if let (Some(first), Some(last)) = (self.children.first(), self.children.last()) {
            self.value.tokens = first.value.tokens.start..last.value.tokens.end;
        }
    }

    /// Merge child `pos` with child `pos+1`; their ranges must be adjacent.
    /// The right child's children are appended to the left child's.
    pub fn merge_consecutive_siblings(&mut self, pos: usize) {
        assert!(pos + 1 < self.children.len(), "no sibling to merge at {}", pos);
        let right = self.children.remove(pos + 1);
        let left = &mut self.children[pos];
        assert_eq!(
            left.value.tokens.end, right.value.tokens.start,
            "merged siblings must have adjacent ranges"
        );
        left.value.tokens.end = right.value.tokens.end;
        left.children.extend(right.children);
        self.verify_ranges();
    }

    /// If this partition has exactly one child, replace it with that child,
    /// keeping the parent's indentation and policy.
    pub fn hoist_only_child(&mut self) -> bool {
        if self.children.len() != 1 {
            return false;
        }
        let child = self.children.pop().expect("checked length");
        let indentation = self.value.indentation;
        let policy = self.value.policy;
        *self = child;
        self.value.indentation = indentation;
        self.value.policy = policy;
        true
    }

    /// Adjust indentation of every line in this subtree to an absolute
    /// amount at the root, shifting descendants by the same delta.
    pub fn adjust_indentation_absolute(&mut self, amount: usize) {
        let delta = amount as isize - self.value.indentation as isize;
        self.adjust_indentation_relative(delta);
    }

    /// Shift indentation of every line in this subtree by `delta`, clamping
    /// at zero.
    pub fn adjust_indentation_relative(&mut self, delta: isize) {
        self.value.indentation = (self.value.indentation as isize + delta).max(0) as usize;
        for child in &mut self.children {
            child.adjust_indentation_relative(delta);
        }
    }

    /// Leaves of the subtree, left to right.
    pub fn leaves(&self) -> Vec<&TokenPartitionTree> {
        let mut out = Vec::new();
        fn go<'a>(node: &'a TokenPartitionTree, out: &mut Vec<&'a TokenPartitionTree>) {
            if node.is_leaf() {
                out.push(node);
            } else {
                for child in &node.children {
                    go(child, out);
                }
            }
        }
        go(self, &mut out);
        out
    }

    /// Paths (child-index sequences) of all leaves.
    pub fn leaf_paths(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        fn go(node: &TokenPartitionTree, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            if node.is_leaf() {
                out.push(path.clone());
            } else {
                for (i, child) in node.children.iter().enumerate() {
                    path.push(i);
                    go(child, path, out);
                    path.pop();
                }
            }
        }
        go(self, &mut Vec::new(), &mut out);
        out
    }

    pub fn descend(&self, path: &[usize]) -> Option<&TokenPartitionTree> {
        let mut node = self;
        for &i in path {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    pub fn descend_mut(&mut self, path: &[usize]) -> Option<&mut TokenPartitionTree> {
        let mut node = self;
        for &i in path {
            node = node.children.get_mut(i)?;
        }
        Some(node)
    }

    /// Merge the leaf at `path` into the previous leaf (across depths).
    /// Ancestor ranges up to the common ancestor are updated. Returns false
    /// when there is no previous leaf.
    pub fn merge_leaf_into_previous_leaf(&mut self, path: &[usize]) -> bool {
        let paths = self.leaf_paths();
        let Some(pos) = paths.iter().position(|p| p == path) else {
            return false;
        };
        if pos == 0 {
            return false;
        }
        self.merge_leaf_pair(&paths[pos - 1], &paths[pos])
    }

    /// Merge the leaf at `path` into the next leaf.
    pub fn merge_leaf_into_next_leaf(&mut self, path: &[usize]) -> bool {
        let paths = self.leaf_paths();
        let Some(pos) = paths.iter().position(|p| p == path) else {
            return false;
        };
        if pos + 1 >= paths.len() {
            return false;
        }
        // Tokens flow forward into the next leaf.
        let donor_range = self.descend(&paths[pos]).expect("leaf path").value.tokens.clone();
        let next_path = paths[pos + 1].clone();
        {
            let next = self.descend_mut(&next_path).expect("leaf path");
            assert_eq!(donor_range.end, next.value.tokens.start, "leaves must abut");
            next.value.tokens.start = donor_range.start;
        }
        // Ancestors of the next leaf that began at the donated boundary now
        // begin at the donated range's start.
        for cut in (0..next_path.len()).rev() {
            let node = self.descend_mut(&next_path[..cut]).expect("ancestor path");
            if node.value.tokens.start == donor_range.end {
                node.value.tokens.start = donor_range.start;
            }
        }
        self.remove_leaf_and_fix_ranges(&paths[pos], donor_range.start);
        self.verify_ranges();
        true
    }

    /// Shared tail of both leaf-merge operations: append the `to` leaf's
    /// range into the `from` leaf (which precedes it), then remove `to`.
    fn merge_leaf_pair(&mut self, prev_path: &[usize], leaf_path: &[usize]) -> bool {
        let donor_range = self.descend(leaf_path).expect("leaf path").value.tokens.clone();
        {
            let prev = self.descend_mut(prev_path).expect("leaf path");
            assert_eq!(
                prev.value.tokens.end, donor_range.start,
                "leaves must abut"
            );
            prev.value.tokens.end = donor_range.end;
        }
        // Extend ancestors of the previous leaf to cover the donated range.
        for cut in (0..prev_path.len()).rev() {
            let node = self.descend_mut(&prev_path[..cut]).expect("ancestor path");
            if node.value.tokens.end == donor_range.start {
                node.value.tokens.end = donor_range.end;
            }
        }
        self.remove_leaf_and_fix_ranges(leaf_path, donor_range.end);
        self.verify_ranges();
        true
    }

    /// Remove the leaf at `path`; ancestors whose range began or ended at
    /// the removed leaf shrink to `boundary`, and emptied ancestors are
    /// removed recursively.
    fn remove_leaf_and_fix_ranges(&mut self, path: &[usize], boundary: usize) {
        assert!(!path.is_empty(), "cannot remove the root");
        let (parent_path, last) = path.split_at(path.len() - 1);
        let parent = self.descend_mut(parent_path).expect("parent path");
        parent.children.remove(last[0]);
        if parent.children.is_empty() {
            if !parent_path.is_empty() {
                self.remove_leaf_and_fix_ranges(parent_path, boundary);
            } else {
                parent.value.tokens = boundary..boundary;
            }
            return;
        }
        parent.update_range_from_children();
        // Fix ancestors upward.
        for cut in (0..parent_path.len()).rev() {
            let node = self.descend_mut(&parent_path[..cut]).expect("ancestor path");
            if !node.children.is_empty() {
                let first = node.children.first().expect("nonempty").value.tokens.start;
                let last_end = node.children.last().expect("nonempty").value.tokens.end;
                node.value.tokens = first..last_end;
            }
        }
    }

    /// Check the range invariants over the whole tree; panics on
    /// violation (programmer error).
    pub fn verify_ranges(&self) {
        if self.is_leaf() {
            return;
        }
        let first = self.children.first().expect("non-leaf");
        let last = self.children.last().expect("non-leaf");
        assert_eq!(
            self.value.tokens.start, first.value.tokens.start,
            "parent must begin at its first child"
        );
        assert_eq!(
            self.value.tokens.end, last.value.tokens.end,
            "parent must end at its last child"
        );
        for pair in self.children.windows(2) {
            assert_eq!(
                pair[0].value.tokens.end, pair[1].value.tokens.start,
                "adjacent siblings must abut"
            );
        }
        for child in &self.children {
            child.verify_ranges();
        }
    }
}
