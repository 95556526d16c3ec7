//! Optimal line wrapping as a best-first search.
//!
//!     Each partial state covers a prefix of the unwrapped line and
//!     carries the current column, the accumulated penalty, and a stack of
//!     wrap-column positions maintained by the bracket balance of the
//!     tokens placed so far. States expand by appending or wrapping the
//!     next token (subject to the annotator's constraints); a priority
//!     queue explores the cheapest prefix first, and the first complete
//!     state wins.
//!
//!     The search is bounded: on exhaustion (pathological inputs) the
//!     caller falls back to rendering the line unwrapped.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::rc::Rc;

use crate::format_token::{GroupBalancing, PreFormatToken, SpacingDecision, SpacingOptions};
use crate::style::FormatStyle;

/// Upper bound on explored states; beyond this the search gives up.
const MAX_SEARCH_STATES: usize = 100_000;

struct StateNode {
    prev: Option<Rc<StateNode>>,
    /// Number of tokens of the line already placed.
    placed: usize,
    decision: SpacingDecision,
    current_column: usize,
    cumulative_cost: i64,
    wrap_columns: Vec<usize>,
}

impl StateNode {
    fn root(ftokens: &[PreFormatToken], indentation: usize, style: &FormatStyle) -> Self {
        let mut state = StateNode {
            prev: None,
            placed: 0,
            decision: SpacingDecision::Append,
            current_column: indentation,
            cumulative_cost: 0,
            wrap_columns: vec![indentation + style.wrap_spaces],
        };
        if let Some(first) = ftokens.first() {
            state.placed = 1;
            state.current_column += first.length();
            state.update_balance(first);
        }
        state
    }

    fn done(&self, ftokens: &[PreFormatToken]) -> bool {
        self.placed >= ftokens.len()
    }

    fn update_balance(&mut self, token: &PreFormatToken) {
        match token.balancing {
            GroupBalancing::Open => {
                // Wrapped members of this group line up just past the
                // opener (never left of the enclosing wrap column).
                let base = self.wrap_columns.last().copied().unwrap_or(0);
                self.wrap_columns.push(self.current_column.max(base));
            }
            GroupBalancing::Close => {
                if self.wrap_columns.len() > 1 {
                    self.wrap_columns.pop();
                }
            }
            GroupBalancing::None => {}
        }
    }

    /// Successor placing the next token with `decision`.
    fn advance(
        self: &Rc<Self>,
        ftokens: &[PreFormatToken],
        source: &str,
        style: &FormatStyle,
        decision: SpacingDecision,
    ) -> StateNode {
        let token = &ftokens[self.placed];
        let mut next = StateNode {
            prev: Some(Rc::clone(self)),
            placed: self.placed + 1,
            decision,
            current_column: self.current_column,
            cumulative_cost: self.cumulative_cost,
            wrap_columns: self.wrap_columns.clone(),
        };
        match decision {
            SpacingDecision::Append => {
                next.current_column += token.before.spaces_required + token.length();
            }
            SpacingDecision::Preserve => {
                next.current_column +=
                    token.original_leading_spaces(source).len() + token.length();
            }
            SpacingDecision::Wrap => {
                next.cumulative_cost += token.break_penalty as i64;
                next.current_column =
                    next.wrap_columns.last().copied().unwrap_or(0) + token.length();
            }
        }
        if next.current_column > style.column_limit {
            next.cumulative_cost += (next.current_column - style.column_limit) as i64
                * style.over_column_limit_penalty as i64;
        }
        next.update_balance(token);
        next
    }
}

/// Decide a spacing decision per token of the line (index 0 is always
/// `Append`: the first token sits at the indentation). Returns `None` when
/// the search was exhausted.
pub fn search_line_wrapping(
    ftokens: &[PreFormatToken],
    source: &str,
    indentation: usize,
    style: &FormatStyle,
) -> Option<Vec<SpacingDecision>> {
    if ftokens.is_empty() {
        return Some(Vec::new());
    }

    struct QueueEntry(i64, usize, Rc<StateNode>);
    impl PartialEq for QueueEntry {
        fn eq(&self, other: &Self) -> bool {
            self.0 == other.0 && self.1 == other.1
        }
    }
    impl Eq for QueueEntry {}
    impl PartialOrd for QueueEntry {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for QueueEntry {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            // Cheapest cost first; deeper progress breaks ties.
            (self.0, Reverse(self.1)).cmp(&(other.0, Reverse(other.1)))
        }
    }

    let mut queue: BinaryHeap<Reverse<QueueEntry>> = BinaryHeap::new();
    let root = Rc::new(StateNode::root(ftokens, indentation, style));
    queue.push(Reverse(QueueEntry(root.cumulative_cost, root.placed, Rc::clone(&root))));

    let mut explored = 0usize;
    while let Some(Reverse(QueueEntry(_, _, state))) = queue.pop() {
        if state.done(ftokens) {
            // Reconstruct decisions along the winning path.
            let mut decisions = vec![SpacingDecision::Append; ftokens.len()];
            let mut cursor: &StateNode = &state;
            loop {
                decisions[cursor.placed - 1] = cursor.decision;
                match &cursor.prev {
                    Some(prev) => cursor = prev,
                    None => break,
                }
            }
            return Some(decisions);
        }
        explored += 1;
        if explored > MAX_SEARCH_STATES {
            return None;
        }

        let token = &ftokens[state.placed];
        let options: &[SpacingDecision] = match token.before.break_decision {
            SpacingOptions::MustAppend | SpacingOptions::AppendAligned => {
                &[SpacingDecision::Append]
            }
            SpacingOptions::MustWrap => &[SpacingDecision::Wrap],
            SpacingOptions::Preserve => &[SpacingDecision::Preserve],
            SpacingOptions::Undecided => &[SpacingDecision::Append, SpacingDecision::Wrap],
        };
        for &decision in options {
            let next = state.advance(ftokens, source, style, decision);
            queue.push(Reverse(QueueEntry(
                next.cumulative_cost,
                next.placed,
                Rc::new(next),
            )));
        }
    }
    None
}
