//! Context-sensitive lexical disambiguation.
//!
//!     SystemVerilog re-uses a handful of token spellings for unrelated
//!     constructs; the worst offender is `->`, which is a logical
//!     implication inside expressions, a constraint implication inside
//!     constraint blocks, and an event trigger at statement positions.
//!     The parser cannot be asked to sort this out, so a single pass walks
//!     the filtered token stream between the lexer and the parser,
//!     maintains a running lexical context, and rewrites each ambiguous
//!     token's kind to a specific one.
//!
//!     The context is a set of cooperating state machines:
//!
//!         - declaration flags (extern/function/task/module, header vs body)
//!         - a flow-control header stack (if/for/foreach/while in parens)
//!         - a balance stack of matched ( [ { openers
//!         - a keyword-label tracker ("may the next token begin an item?")
//!         - a randomize-call tracker (randomize ... with (vars)? { ... })
//!         - a constraint-block machine (statement vs expression position)
//!         - a last-semicolon tracker marking the final `;` of the
//!           assertion-variable region in property declarations
//!
//!     Malformed input must never crash this pass: unmatched closers unwind
//!     gracefully and any imbalance left at EOF is the parser's problem.

use crate::token::{Token, TokenKind};
use crate::view::TokenStreamView;

/// Keyword-label tracker.
///
/// Knows whether the next token can begin a new item. Starts true; turned
/// off by ordinary tokens; turned back on by `;`, by `begin`/`fork`, and by
/// the `: label` that may follow `begin` and the `end`-family keywords.
#[derive(Debug, Default)]
struct KeywordLabelTracker {
    state: KeywordLabelState,
}

#[derive(Debug, Default, PartialEq)]
enum KeywordLabelState {
    #[default]
    ItemStart,
    /// After `begin`/`fork`/`end`-family: an item may start, and a `:` label
    /// may still follow.
    Labelable,
    /// After the `:` of a label, waiting for the label identifier.
    ExpectLabel,
    Other,
}

impl KeywordLabelTracker {
    fn item_may_start(&self) -> bool {
        matches!(
            self.state,
            KeywordLabelState::ItemStart | KeywordLabelState::Labelable
        )
    }

    fn update(&mut self, kind: TokenKind) {
        use KeywordLabelState::*;
        self.state = match self.state {
            Labelable if kind == TokenKind::Colon => ExpectLabel,
            ExpectLabel if kind == TokenKind::Identifier => ItemStart,
            _ => match kind {
                TokenKind::Semicolon => ItemStart,
                TokenKind::Begin | TokenKind::Fork => Labelable,
                k if k.is_end_keyword() => Labelable,
                _ => Other,
            },
        };
    }
}

/// Constraint-block machine: decides whether `->` at the current position
/// is a constraint implication (statement level of a constraint set) or a
/// logical implication (inside a parenthesized or concatenated
/// sub-expression).
#[derive(Debug, Default)]
struct ConstraintBlockStateMachine {
    stack: Vec<ConstraintPos>,
    /// Next `{` opens a constraint set rather than a concatenation: set
    /// after `->`, `else`, and the `)` closing an `if`/`foreach` header.
    brace_opens_set: bool,
    /// An `if`/`foreach` keyword was seen; its `(` is the header paren.
    pending_ctrl_paren: bool,
    /// Inside a `soft`/`disable soft` item, where `->` is expression-level.
    in_soft_item: bool,
}

#[derive(Debug, PartialEq)]
enum ConstraintPos {
    /// Statement level of a constraint set `{ ... }`.
    StatementList,
    /// Inside `(` or `[`; the flag marks an `if`/`foreach` header paren.
    Paren { ctrl_header: bool },
    /// Inside an expression `{ ... }` (concatenation or replication).
    Concat,
}

impl ConstraintBlockStateMachine {
    fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Open the outermost constraint block brace.
    fn enter_block(&mut self) {
        self.stack.push(ConstraintPos::StatementList);
        self.brace_opens_set = false;
        self.pending_ctrl_paren = false;
        self.in_soft_item = false;
    }

    fn interpret_arrow(&self) -> TokenKind {
        match self.stack.last() {
            Some(ConstraintPos::StatementList) if !self.in_soft_item => {
                TokenKind::ConstraintImplies
            }
            _ => TokenKind::LogicalImplies,
        }
    }

    /// Consume one token. Call only while active; the outermost opener goes
    /// through [`enter_block`]. Returns the rewritten kind for `->`.
    fn update(&mut self, kind: TokenKind) -> Option<TokenKind> {
        let mut rewritten = None;
        let mut next_brace_opens_set = false;
        match kind {
            TokenKind::RArrow => {
                let interpreted = self.interpret_arrow();
                rewritten = Some(interpreted);
                next_brace_opens_set = interpreted == TokenKind::ConstraintImplies;
            }
            TokenKind::LBrace => {
                if self.brace_opens_set {
                    self.stack.push(ConstraintPos::StatementList);
                    next_brace_opens_set = false;
                } else {
                    self.stack.push(ConstraintPos::Concat);
                }
            }
            TokenKind::RBrace => {
                // Graceful on imbalance: pop whatever is open.
                self.stack.pop();
                if matches!(self.stack.last(), Some(ConstraintPos::StatementList)) {
                    self.in_soft_item = false;
                }
            }
            TokenKind::LParen | TokenKind::LBracket => {
                self.stack.push(ConstraintPos::Paren {
                    ctrl_header: self.pending_ctrl_paren && kind == TokenKind::LParen,
                });
                self.pending_ctrl_paren = false;
            }
            TokenKind::RParen | TokenKind::RBracket => {
                if let Some(ConstraintPos::Paren { ctrl_header }) = self.stack.last() {
                    next_brace_opens_set = *ctrl_header;
                    self.stack.pop();
                }
            }
            TokenKind::Semicolon => {
                self.in_soft_item = false;
            }
            TokenKind::If | TokenKind::Foreach => {
                self.pending_ctrl_paren = true;
            }
            TokenKind::Else => {
                next_brace_opens_set = true;
            }
            TokenKind::Soft => {
                if matches!(self.stack.last(), Some(ConstraintPos::StatementList)) {
                    self.in_soft_item = true;
                }
            }
            _ => {}
        }
        self.brace_opens_set = next_brace_opens_set;
        rewritten
    }
}

/// Randomize-call tracker: `randomize` [ `(args)` ] [ `with` [ `(vars)` ]
/// `{ constraint-block }` ]. Delegates the block to the constraint machine.
#[derive(Debug, Default)]
struct RandomizeCallTracker {
    state: RandomizeState,
    constraint: ConstraintBlockStateMachine,
}

#[derive(Debug, Default, PartialEq)]
enum RandomizeState {
    #[default]
    Inactive,
    /// Saw `randomize`; a call arg list, `with`, or the end of the call may
    /// follow.
    Called,
    /// Inside the call's own `( args )`.
    InCallArgs(usize),
    /// Saw `with`; an optional variable list or the block brace follows.
    ExpectVarsOrBlock,
    /// Inside `with ( vars )`.
    InVars(usize),
    /// After `with ( vars )`, expecting the block brace.
    ExpectBlock,
    /// Inside the constraint block.
    InBlock,
}

impl RandomizeCallTracker {
    fn is_active(&self) -> bool {
        self.state != RandomizeState::Inactive
    }

    fn in_constraint_block(&self) -> bool {
        self.state == RandomizeState::InBlock
    }

    fn update(&mut self, kind: TokenKind) -> Option<TokenKind> {
        use RandomizeState::*;
        match self.state {
            Inactive => {
                if kind == TokenKind::Randomize {
                    self.state = Called;
                }
                None
            }
            Called => {
                match kind {
                    TokenKind::LParen => self.state = InCallArgs(1),
                    TokenKind::With => self.state = ExpectVarsOrBlock,
                    // Any statement-ending or enclosing token ends the call.
                    _ => self.state = Inactive,
                }
                None
            }
            InCallArgs(depth) => {
                match kind {
                    TokenKind::LParen => self.state = InCallArgs(depth + 1),
                    TokenKind::RParen => {
                        self.state = if depth == 1 { Called } else { InCallArgs(depth - 1) };
                    }
                    _ => {}
                }
                None
            }
            ExpectVarsOrBlock => {
                match kind {
                    TokenKind::LParen => self.state = InVars(1),
                    TokenKind::LBrace => {
                        self.state = InBlock;
                        self.constraint.enter_block();
                    }
                    _ => self.state = Inactive,
                }
                None
            }
            InVars(depth) => {
                match kind {
                    TokenKind::LParen => self.state = InVars(depth + 1),
                    TokenKind::RParen => {
                        self.state = if depth == 1 { ExpectBlock } else { InVars(depth - 1) };
                    }
                    _ => {}
                }
                None
            }
            ExpectBlock => {
                match kind {
                    TokenKind::LBrace => {
                        self.state = InBlock;
                        self.constraint.enter_block();
                    }
                    _ => self.state = Inactive,
                }
                None
            }
            InBlock => {
                let rewritten = self.constraint.update(kind);
                if !self.constraint.is_active() {
                    self.state = Inactive;
                }
                rewritten
            }
        }
    }
}

/// Constraint-declaration tracker: `constraint name { ... }` (not the
/// `extern constraint name;` prototype).
#[derive(Debug, Default)]
struct ConstraintDeclarationTracker {
    state: ConstraintDeclState,
    constraint: ConstraintBlockStateMachine,
}

#[derive(Debug, Default, PartialEq)]
enum ConstraintDeclState {
    #[default]
    Inactive,
    /// After the `constraint` keyword, before the block brace.
    ExpectBlock,
    InBlock,
}

impl ConstraintDeclarationTracker {
    fn is_active(&self) -> bool {
        self.state != ConstraintDeclState::Inactive
    }

    fn in_constraint_block(&self) -> bool {
        self.state == ConstraintDeclState::InBlock
    }

    fn activate(&mut self) {
        self.state = ConstraintDeclState::ExpectBlock;
    }

    fn update(&mut self, kind: TokenKind) -> Option<TokenKind> {
        use ConstraintDeclState::*;
        match self.state {
            Inactive => None,
            ExpectBlock => {
                match kind {
                    TokenKind::LBrace => {
                        self.state = InBlock;
                        self.constraint.enter_block();
                    }
                    TokenKind::Identifier | TokenKind::ColonColon => {}
                    // A `;` here was a prototype; anything else is malformed.
                    _ => self.state = Inactive,
                }
                None
            }
            InBlock => {
                let rewritten = self.constraint.update(kind);
                if !self.constraint.is_active() {
                    self.state = Inactive;
                }
                rewritten
            }
        }
    }
}

/// Last-semicolon tracker, parameterized by an opener/closer keyword pair.
///
/// While between the opener and the closer it records the sequence index of
/// every `;`; on the closer it asks for the most recently recorded one to
/// be rewritten. Used to mark the end of the assertion-variable region in
/// `property ... endproperty`.
#[derive(Debug)]
struct LastSemicolonTracker {
    opener: TokenKind,
    closer: TokenKind,
    rewrite_to: TokenKind,
    active: bool,
    last_semicolon: Option<usize>,
}

impl LastSemicolonTracker {
    fn new(opener: TokenKind, closer: TokenKind, rewrite_to: TokenKind) -> Self {
        LastSemicolonTracker {
            opener,
            closer,
            rewrite_to,
            active: false,
            last_semicolon: None,
        }
    }

    fn update(&mut self, kind: TokenKind, seq_index: usize) -> Option<(usize, TokenKind)> {
        if kind == self.opener {
            self.active = true;
            self.last_semicolon = None;
            return None;
        }
        if !self.active {
            return None;
        }
        if kind == TokenKind::Semicolon {
            self.last_semicolon = Some(seq_index);
            return None;
        }
        if kind == self.closer {
            self.active = false;
            return self.last_semicolon.take().map(|i| (i, self.rewrite_to));
        }
        None
    }
}

#[derive(Debug)]
struct BalanceEntry {
    opener: TokenKind,
    /// The paren opening a flow-control header.
    flow_header: bool,
    /// The paren opening a macro call's argument list.
    macro_call: bool,
}

/// The running lexical context. Feed it the filtered token stream in order.
#[derive(Debug)]
pub struct LexicalContext {
    previous_kind: Option<TokenKind>,
    in_extern_declaration: bool,
    /// An extern prototype header is in flight; its `;` must not open a body.
    extern_header: bool,
    in_function_declaration: bool,
    in_function_body: bool,
    in_task_declaration: bool,
    in_task_body: bool,
    in_module_declaration: bool,
    in_module_body: bool,
    in_initial_always_final_construct: bool,
    /// Depth of begin/fork blocks inside the initial/always/final construct.
    iaf_block_depth: usize,
    iaf_has_block: bool,
    previous_token_finished_header: bool,
    flow_control_pending_paren: bool,
    flow_control_depth: usize,
    balance_stack: Vec<BalanceEntry>,
    keyword_label_tracker: KeywordLabelTracker,
    randomize_call_tracker: RandomizeCallTracker,
    constraint_declaration_tracker: ConstraintDeclarationTracker,
    property_semicolon_tracker: LastSemicolonTracker,
    /// A macro call id was just seen; its `(` is the argument list.
    macro_call_pending_paren: bool,
}

impl Default for LexicalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalContext {
    pub fn new() -> Self {
        LexicalContext {
            previous_kind: None,
            in_extern_declaration: false,
            extern_header: false,
            in_function_declaration: false,
            in_function_body: false,
            in_task_declaration: false,
            in_task_body: false,
            in_module_declaration: false,
            in_module_body: false,
            in_initial_always_final_construct: false,
            iaf_block_depth: 0,
            iaf_has_block: false,
            previous_token_finished_header: false,
            flow_control_pending_paren: false,
            flow_control_depth: 0,
            balance_stack: Vec::new(),
            keyword_label_tracker: KeywordLabelTracker::default(),
            randomize_call_tracker: RandomizeCallTracker::default(),
            constraint_declaration_tracker: ConstraintDeclarationTracker::default(),
            property_semicolon_tracker: LastSemicolonTracker::new(
                TokenKind::Property,
                TokenKind::EndProperty,
                TokenKind::SemicolonEndOfAssertionVariables,
            ),
            macro_call_pending_paren: false,
        }
    }

    fn in_any_declaration_header(&self) -> bool {
        (self.in_function_declaration && !self.in_function_body)
            || (self.in_task_declaration && !self.in_task_body)
            || (self.in_module_declaration && !self.in_module_body)
            || self.extern_header
    }

    fn in_flow_control_header(&self) -> bool {
        self.flow_control_depth > 0 || self.flow_control_pending_paren
    }

    fn expecting_body_item_start(&self) -> bool {
        if self.previous_kind.is_none() {
            return true; // first token
        }
        if self.in_any_declaration_header() {
            return false;
        }
        if self.previous_token_finished_header {
            return true;
        }
        if matches!(
            self.previous_kind,
            Some(TokenKind::Initial)
                | Some(TokenKind::Always)
                | Some(TokenKind::AlwaysComb)
                | Some(TokenKind::AlwaysFf)
                | Some(TokenKind::AlwaysLatch)
                | Some(TokenKind::Final)
        ) {
            return true;
        }
        self.keyword_label_tracker.item_may_start()
    }

    fn expecting_statement(&self) -> bool {
        (self.in_function_body || self.in_task_body || self.in_initial_always_final_construct)
            && self.expecting_body_item_start()
    }

    fn in_expression_brackets(&self) -> bool {
        self.balance_stack
            .iter()
            .any(|e| matches!(e.opener, TokenKind::LParen | TokenKind::LBracket))
    }

    /// `->` outside constraint blocks: event trigger at statement
    /// positions, logical implication inside headers, brackets, and
    /// right-hand-side expressions.
    fn interpret_arrow(&self) -> TokenKind {
        if self.in_flow_control_header() || self.in_expression_brackets() {
            return TokenKind::LogicalImplies;
        }
        if self.expecting_statement() {
            return TokenKind::Trigger;
        }
        TokenKind::LogicalImplies
    }

    /// Advance over one token (by sequence index), rewriting its kind when
    /// the context disambiguates it. `followed_by_newline` tells whether the
    /// next non-comment token sits on a later line; `deferred` receives
    /// rewrites of earlier tokens (the last-semicolon rule).
    pub fn advance(
        &mut self,
        token: &mut Token,
        seq_index: usize,
        followed_by_newline: bool,
        deferred: &mut Vec<(usize, TokenKind)>,
    ) {
        // Delegation: inside a constraint block the dedicated machine owns
        // interpretation; it sees every token exactly once.
        let delegated = self.randomize_call_tracker.in_constraint_block()
            || self.constraint_declaration_tracker.in_constraint_block();

        if delegated {
            let rewritten = if self.randomize_call_tracker.in_constraint_block() {
                self.randomize_call_tracker.update(token.kind)
            } else {
                self.constraint_declaration_tracker.update(token.kind)
            };
            if let Some(kind) = rewritten {
                token.kind = kind;
            }
        } else {
            // Interpret ambiguous tokens against the current state.
            match token.kind {
                TokenKind::RArrow => token.kind = self.interpret_arrow(),
                TokenKind::RArrow2 => {
                    if !self.in_flow_control_header()
                        && !self.in_expression_brackets()
                        && self.expecting_statement()
                    {
                        token.kind = TokenKind::NonblockingTrigger;
                    }
                }
                TokenKind::RParen => {
                    if let Some(top) = self.balance_stack.last() {
                        if top.macro_call && followed_by_newline {
                            token.kind = TokenKind::MacroCallCloseToEndLine;
                        }
                    }
                }
                _ => {}
            }
            // Feed the call/declaration trackers outside their blocks.
            self.randomize_call_tracker.update(token.kind);
            self.constraint_declaration_tracker.update(token.kind);
        }

        if let Some(rewrite) = self
            .property_semicolon_tracker
            .update(token.kind, seq_index)
        {
            deferred.push(rewrite);
        }

        self.update_state(token.kind);
        self.previous_kind = Some(token.kind);
    }

    fn update_state(&mut self, kind: TokenKind) {
        let mut finished_header = false;

        // Balance stack, with graceful unwinding on mismatch.
        match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                let flow_header = self.flow_control_pending_paren && kind == TokenKind::LParen;
                if flow_header {
                    self.flow_control_pending_paren = false;
                    self.flow_control_depth += 1;
                }
                let macro_call = self.macro_call_pending_paren && kind == TokenKind::LParen;
                self.macro_call_pending_paren = false;
                self.balance_stack.push(BalanceEntry {
                    opener: kind,
                    flow_header,
                    macro_call,
                });
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
            | TokenKind::MacroCallCloseToEndLine => {
                let expected = match kind {
                    TokenKind::RParen | TokenKind::MacroCallCloseToEndLine => TokenKind::LParen,
                    TokenKind::RBracket => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                };
                // Unwind to the nearest matching opener; a closer with no
                // match anywhere is ignored.
                if let Some(pos) = self
                    .balance_stack
                    .iter()
                    .rposition(|e| e.opener == expected)
                {
                    while self.balance_stack.len() > pos {
                        let entry = self.balance_stack.pop().unwrap();
                        if entry.flow_header {
                            self.flow_control_depth =
                                self.flow_control_depth.saturating_sub(1);
                            if entry.opener == expected {
                                finished_header = true;
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        match kind {
            TokenKind::Extern => {
                self.in_extern_declaration = true;
            }
            TokenKind::Function => {
                if self.in_extern_declaration {
                    self.extern_header = true;
                } else {
                    self.in_function_declaration = true;
                    self.in_function_body = false;
                }
            }
            TokenKind::EndFunction => {
                self.in_function_declaration = false;
                self.in_function_body = false;
            }
            TokenKind::Task => {
                if self.in_extern_declaration {
                    self.extern_header = true;
                } else {
                    self.in_task_declaration = true;
                    self.in_task_body = false;
                }
            }
            TokenKind::EndTask => {
                self.in_task_declaration = false;
                self.in_task_body = false;
            }
            TokenKind::Module | TokenKind::Interface | TokenKind::Program => {
                self.in_module_declaration = true;
                self.in_module_body = false;
            }
            TokenKind::EndModule | TokenKind::EndInterface | TokenKind::EndProgram => {
                self.in_module_declaration = false;
                self.in_module_body = false;
            }
            TokenKind::Constraint => {
                if self.in_extern_declaration {
                    // Prototype: no block follows, and extern is spent.
                    self.in_extern_declaration = false;
                } else {
                    self.constraint_declaration_tracker.activate();
                }
            }
            TokenKind::Initial
            | TokenKind::Always
            | TokenKind::AlwaysComb
            | TokenKind::AlwaysFf
            | TokenKind::AlwaysLatch
            | TokenKind::Final => {
                self.in_initial_always_final_construct = true;
                self.iaf_block_depth = 0;
                self.iaf_has_block = false;
            }
            TokenKind::If | TokenKind::For | TokenKind::Foreach | TokenKind::While => {
                self.flow_control_pending_paren = true;
            }
            TokenKind::MacroCallId => {
                self.macro_call_pending_paren = true;
            }
            TokenKind::Begin | TokenKind::Fork => {
                if self.in_initial_always_final_construct {
                    self.iaf_has_block = true;
                    self.iaf_block_depth += 1;
                }
            }
            TokenKind::End | TokenKind::Join | TokenKind::JoinAny | TokenKind::JoinNone => {
                if self.in_initial_always_final_construct {
                    self.iaf_block_depth = self.iaf_block_depth.saturating_sub(1);
                    if self.iaf_block_depth == 0 {
                        self.in_initial_always_final_construct = false;
                    }
                }
            }
            TokenKind::Semicolon | TokenKind::SemicolonEndOfAssertionVariables => {
                if self.balance_stack.is_empty() {
                    if self.extern_header {
                        // The extern prototype header ends here; no body.
                        self.extern_header = false;
                        self.in_extern_declaration = false;
                    } else if self.in_function_declaration && !self.in_function_body {
                        self.in_function_body = true;
                        finished_header = true;
                    } else if self.in_task_declaration && !self.in_task_body {
                        self.in_task_body = true;
                        finished_header = true;
                    } else if self.in_module_declaration && !self.in_module_body {
                        self.in_module_body = true;
                        finished_header = true;
                    }
                    if self.in_initial_always_final_construct && !self.iaf_has_block {
                        // A single-statement construct ends at its `;`.
                        self.in_initial_always_final_construct = false;
                    }
                }
            }
            _ => {}
        }

        self.keyword_label_tracker.update(kind);
        self.previous_token_finished_header = finished_header;
    }
}

/// Whether the text between `span_end` and the next non-comment token
/// contains a newline (or runs to EOF).
fn newline_follows(tokens: &[Token], seq_index: usize, source: &str) -> bool {
    let mut i = seq_index + 1;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Whitespace => {
                if tokens[i].text(source).contains('\n') {
                    return true;
                }
            }
            TokenKind::LineComment | TokenKind::BlockComment => {}
            TokenKind::Eof => return true,
            _ => return false,
        }
        i += 1;
    }
    true
}

/// Run the context rewriter over the filtered view, mutating token kinds in
/// the backing sequence.
pub fn rewrite_tokens(source: &str, tokens: &mut [Token], view: &TokenStreamView) {
    let mut context = LexicalContext::new();
    let mut deferred: Vec<(usize, TokenKind)> = Vec::new();
    for &index in view {
        let followed_by_newline = newline_follows(tokens, index, source);
        let mut token = tokens[index];
        context.advance(&mut token, index, followed_by_newline, &mut deferred);
        tokens[index] = token;
        for (target, kind) in deferred.drain(..) {
            tokens[target].kind = kind;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::view::{filter_for_syntax, init_view};

    /// Lex, filter, rewrite; return the kinds of the view tokens.
    fn rewritten_kinds(source: &str) -> Vec<TokenKind> {
        let mut lexed = tokenize(source);
        let mut view = init_view(&lexed.tokens);
        filter_for_syntax(&lexed.tokens, &mut view);
        rewrite_tokens(source, &mut lexed.tokens, &view);
        view.iter().map(|&i| lexed.tokens[i].kind).collect()
    }

    fn arrows(source: &str) -> Vec<TokenKind> {
        rewritten_kinds(source)
            .into_iter()
            .filter(|k| {
                matches!(
                    k,
                    TokenKind::LogicalImplies
                        | TokenKind::ConstraintImplies
                        | TokenKind::Trigger
                        | TokenKind::NonblockingTrigger
                        | TokenKind::RArrow
                        | TokenKind::RArrow2
                )
            })
            .collect()
    }

    #[test]
    fn test_function_body_arrows() {
        use TokenKind::*;
        let source = "
  function void foo;
    -> z;
    if (a -> b) -> y;
    -> w;
    for (; c -> d; ) begin
      -> y;
    end
  endfunction
  ";
        assert_eq!(
            arrows(source),
            vec![Trigger, LogicalImplies, Trigger, Trigger, LogicalImplies, Trigger]
        );
    }

    #[test]
    fn test_block_labels_keep_statement_position() {
        use TokenKind::*;
        let source = "
  function void foo;
    if (a -> b) begin : bar
      -> y;
    end : bar
    -> z;
  endfunction
  ";
        assert_eq!(arrows(source), vec![LogicalImplies, Trigger, Trigger]);
    }

    #[test]
    fn test_task_arrows() {
        use TokenKind::*;
        let source = "
  task foo;
    -> z;
    if (a -> b) -> y;
  endtask
  ";
        assert_eq!(arrows(source), vec![Trigger, LogicalImplies, Trigger]);
    }

    #[test]
    fn test_initial_trigger_and_rhs_implication() {
        use TokenKind::*;
        let source = "
  module foo;
  initial -> x;
  assign a = b -> x;
  endmodule
  ";
        assert_eq!(arrows(source), vec![Trigger, LogicalImplies]);
    }

    #[test]
    fn test_assignment_rhs_in_seq_block() {
        use TokenKind::*;
        let source = "
  module foo;
    initial begin
      a = b -> x;
    end
  endmodule
  ";
        assert_eq!(arrows(source), vec![LogicalImplies]);
    }

    #[test]
    fn test_nonblocking_trigger() {
        use TokenKind::*;
        let source = "
  task t;
    ->> z;
  endtask
  ";
        assert_eq!(arrows(source), vec![NonblockingTrigger]);
    }

    #[test]
    fn test_constraint_declaration_implication() {
        use TokenKind::*;
        assert_eq!(
            arrows("constraint c { a -> b; }"),
            vec![ConstraintImplies]
        );
    }

    #[test]
    fn test_constraint_if_blocks() {
        use TokenKind::*;
        assert_eq!(
            arrows("constraint c { if (a -> b) { c -> d; } }"),
            vec![LogicalImplies, ConstraintImplies]
        );
    }

    #[test]
    fn test_constraint_if_else_single() {
        use TokenKind::*;
        assert_eq!(
            arrows("constraint c { if (a -> b) c -> d; else e -> f; }"),
            vec![LogicalImplies, ConstraintImplies, ConstraintImplies]
        );
    }

    #[test]
    fn test_constraint_nested_sets_and_parens() {
        use TokenKind::*;
        assert_eq!(
            arrows("constraint c { a -> b; (c -> d) -> e; f -> { (g -> h) -> i; } }"),
            vec![
                ConstraintImplies,
                LogicalImplies,
                ConstraintImplies,
                ConstraintImplies,
                LogicalImplies,
                ConstraintImplies,
            ]
        );
    }

    #[test]
    fn test_constraint_braced_expressions() {
        use TokenKind::*;
        assert_eq!(
            arrows(
                "constraint c {
                   {2{4'h0}} -> {2{4'h1}};
                   ({2{4'h2}} -> {2{4'h3}}) -> {2{4'h4}};
                 }"
            ),
            vec![ConstraintImplies, LogicalImplies, ConstraintImplies]
        );
    }

    #[test]
    fn test_constraint_soft_is_expression_level() {
        use TokenKind::*;
        assert_eq!(
            arrows("constraint c { soft a -> b; c -> d; }"),
            vec![LogicalImplies, ConstraintImplies]
        );
    }

    #[test]
    fn test_constraint_foreach() {
        use TokenKind::*;
        assert_eq!(
            arrows("constraint c { foreach (a[i]) { c -> d; } }"),
            vec![ConstraintImplies]
        );
    }

    #[test]
    fn test_randomize_with_block() {
        use TokenKind::*;
        let source = "
function void rat(seq_item item);
  if (!item.randomize() with
      {
        (x -> y) -> {
          a inside {[1 : 2]};
        }
      }) begin
  end
endfunction : rat
";
        assert_eq!(arrows(source), vec![LogicalImplies, ConstraintImplies]);
    }

    #[test]
    fn test_randomize_with_variable_list() {
        use TokenKind::*;
        assert_eq!(
            arrows("task t; if (y.randomize with (j, k) {a -> b;}) begin end endtask"),
            vec![ConstraintImplies]
        );
    }

    #[test]
    fn test_randomize_with_empty_variable_list() {
        use TokenKind::*;
        assert_eq!(
            arrows("task t; if (y.randomize with () {a -> b;}) begin end endtask"),
            vec![ConstraintImplies]
        );
    }

    #[test]
    fn test_extern_function_suppresses_body_context() {
        use TokenKind::*;
        // The `->` after the extern prototype is at class-item level, not in
        // a function body, so it stays a logical implication context-wise;
        // the constraint block afterwards still works.
        let source = "
class n;
  extern function foo;
endclass

constraint v {
  m -> {
    x != y;
  }
}
";
        assert_eq!(arrows(source), vec![ConstraintImplies]);
    }

    #[test]
    fn test_property_last_semicolon_rewrite() {
        use TokenKind::*;
        let source = "
module m;
property p;
  logic v;
  a |-> b;
endproperty
endmodule
";
        let kinds = rewritten_kinds(source);
        let semis: Vec<TokenKind> = kinds
            .iter()
            .copied()
            .filter(|k| {
                matches!(
                    k,
                    Semicolon | SemicolonEndOfAssertionVariables
                )
            })
            .collect();
        // module-header ;, property-header ;, declaration ;, and the last
        // one recorded inside the property carries the marker.
        assert_eq!(
            semis,
            vec![
                Semicolon,
                Semicolon,
                Semicolon,
                SemicolonEndOfAssertionVariables
            ]
        );
    }

    #[test]
    fn test_macro_call_close_to_end_line() {
        use TokenKind::*;
        let kinds = rewritten_kinds("`so_call_me_baby()\n");
        assert_eq!(kinds, vec![MacroCallId, LParen, MacroCallCloseToEndLine]);

        let kinds = rewritten_kinds("`so_call_me_baby()  // comment\n");
        assert_eq!(
            kinds,
            vec![MacroCallId, LParen, MacroCallCloseToEndLine]
        );

        let kinds = rewritten_kinds("`macro1(foo, `inner(11));\n");
        assert!(kinds.contains(&RParen));
        assert!(!kinds.contains(&MacroCallCloseToEndLine));
    }

    #[test]
    fn test_unbalanced_input_does_not_crash() {
        use TokenKind::*;
        // Stray closers unwind gracefully; imbalance at EOF is fine.
        let kinds = rewritten_kinds(") } ] constraint c { a -> b; ");
        assert!(kinds.contains(&ConstraintImplies));
        rewritten_kinds("task t; ) -> x; endtask");
        rewritten_kinds("function f; if (a endfunction");
    }

    #[test]
    fn test_rewrites_are_monotonic() {
        // Every rewritten kind must be a permitted target of its raw kind.
        let source = "
task t;
  -> a;
  ->> b;
  if (x -> y) -> c;
endtask
constraint k { p -> q; }
";
        let mut lexed = tokenize(source);
        let before = lexed.tokens.clone();
        let mut view = init_view(&lexed.tokens);
        filter_for_syntax(&lexed.tokens, &mut view);
        rewrite_tokens(source, &mut lexed.tokens, &view);
        for (old, new) in before.iter().zip(lexed.tokens.iter()) {
            if old.kind != new.kind {
                assert!(
                    old.kind.permitted_rewrites().contains(&new.kind),
                    "{:?} must not become {:?}",
                    old.kind,
                    new.kind
                );
            }
        }
    }
}
